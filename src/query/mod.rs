mod cache;
mod key;
mod options;
mod state;

pub use self::{
    cache::{QueryCache, Subscription},
    key::{KeyPart, QueryKey},
    options::QueryOptions,
    state::{QueryState, QueryStatus},
};
