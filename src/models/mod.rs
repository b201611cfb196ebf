pub mod config;
pub mod media;
pub mod payment;
pub mod session;

pub use config::{
    AppConfig, GatewayCredentials, PaymentConfig, PrinterConfig, ServerConfig, StorageConfig,
};
pub use media::{
    AssetIndex, IncomingFile, MediaKind, SessionAsset, StoredObject, UploadedAsset,
};
pub use payment::{
    CallbackPayload, CreatePaymentRequest, CreatePaymentResponse, PaymentOrder, PaymentRecord,
    PaymentStatus, QrisPayment,
};
pub use session::SessionId;
