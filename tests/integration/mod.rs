//! Integration tests for the filename index system

mod build_search;
mod manager_lifecycle;
mod test_utils;
