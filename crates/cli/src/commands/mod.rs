pub mod configure;
pub mod forecast;
pub mod hierarchy;
pub mod report;
