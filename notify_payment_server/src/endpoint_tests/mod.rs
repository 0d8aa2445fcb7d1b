mod deals;
mod helpers;
mod notify;
mod registry;
