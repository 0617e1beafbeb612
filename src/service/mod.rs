pub mod dispatch;
pub mod fetcher;
pub mod formatter;
pub mod pairing;
pub mod session;

pub use dispatch::{DispatchError, DispatchReport, DispatchService};
pub use fetcher::{FetchError, HttpImageFetcher, ImageFetcher};
pub use formatter::{format_currency, format_sale_message};
pub use pairing::{render_qr_data_url, RenderError};
pub use session::SessionManager;
