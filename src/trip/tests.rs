pub(crate) mod utils;

mod proptests;
