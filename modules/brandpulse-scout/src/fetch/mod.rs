pub mod browser_fetcher;
pub mod browserless;
pub mod chrome;
pub mod cookies;
pub mod retry;
pub mod traits;

pub use browser_fetcher::{BrowserFetcher, FetchOptions};
pub use browserless::BrowserlessRenderer;
pub use chrome::ChromeRenderer;
pub use cookies::CookieJar;
pub use retry::RetryPolicy;
pub use traits::{PageRenderer, RenderRequest, RenderedPage, ScrollPlan, TargetFetcher};
