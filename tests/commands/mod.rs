//! Command-level tests

mod test_ask;
mod test_chat;
mod test_preprocess;
