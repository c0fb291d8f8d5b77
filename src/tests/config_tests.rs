//! tests/config_tests.rs - Items API base URL handling

#[cfg(test)]
mod tests {
    use crate::config::Config;

    fn with_items_api(url: Option<&str>) -> Config {
        Config {
            items_api_url: url.map(str::to_string),
            ..Config::default()
        }
    }

    #[test]
    fn test_unset_items_api_means_in_process_server() {
        assert_eq!(Config::default().items_api_url, None);
        assert_eq!(with_items_api(None).items_api_base().unwrap(), None);
    }

    #[test]
    fn test_items_api_base_joins_under_its_path() {
        let base = with_items_api(Some("http://demo.local:9000/site"))
            .items_api_base()
            .unwrap()
            .unwrap();
        assert_eq!(base.as_str(), "http://demo.local:9000/site/");
        assert_eq!(
            base.join("api/demos/items").unwrap().as_str(),
            "http://demo.local:9000/site/api/demos/items"
        );

        let base = with_items_api(Some(" http://127.0.0.1:8080/ "))
            .items_api_base()
            .unwrap()
            .unwrap();
        assert_eq!(base.as_str(), "http://127.0.0.1:8080/");
    }

    #[test]
    fn test_invalid_items_api_url_is_an_error() {
        assert!(with_items_api(Some("not a url")).items_api_base().is_err());
    }
}
