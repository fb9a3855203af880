//! Browser automation module
//!
//! This module provides browser control through ChromiumOxide for pages
//! that only render their content with JavaScript.

pub mod controller;
pub mod navigation;

pub use controller::{BrowserConfig, BrowserController, PageHandle};
pub use navigation::{NavigationOptions, NavigationResult, PageNavigator, UrlValidator};
