pub mod guard;
pub mod headers;
pub mod media;
pub mod payment;
pub mod print;

pub use guard::{rate_limit, require_api_key, ApiKeyGuard, ClientLimit};
pub use media::{handle_upload, handle_view, __path_handle_upload, __path_handle_view};
pub use media::{EmptySessionResponse, SessionQuery, UploadResponse, ViewResponse};
pub use payment::{handle_callback, handle_create_payment, handle_payment_status};
pub use payment::{
    __path_handle_callback, __path_handle_create_payment, __path_handle_payment_status,
};
pub use print::{handle_print_image, handle_print_text, __path_handle_print_image, __path_handle_print_text};
pub use print::{PrintImageResponse, PrintTextRequest, PrintTextResponse};
