pub mod inflation_refresh;

pub use inflation_refresh::{
    refresh_inflation_series, spawn_inflation_refresher, FileInflationSource, KarmaInflationSource,
};
