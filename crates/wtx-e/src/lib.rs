pub mod driver;
pub mod scripts;
pub mod webdriver;

pub use driver::FantocciniDriver;
pub use webdriver::{WebDriverClient, WebDriverFactory};
