use crate::config::Config;
use crate::store::ItemStore;

pub struct AppState {
    pub config: Config,
    pub store: ItemStore,
}
