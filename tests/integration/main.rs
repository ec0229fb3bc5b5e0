//! Integration tests for News-Sweep
//!
//! These tests use wiremock to stand in for the news site and the model API.

mod crawl_tests;
mod fetcher_tests;
mod summarizer_tests;
