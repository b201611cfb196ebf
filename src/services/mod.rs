pub mod escpos;
pub mod gateway;
pub mod media;
pub mod order_ledger;
pub mod payments;
pub mod printer;
pub mod rate_limit;
pub mod signature;
pub mod storage;

pub use gateway::{DuitkuGateway, PaymentGateway};
pub use media::{MediaService, UploadOutcome};
pub use order_ledger::{InMemoryLedger, OrderLedger};
pub use payments::{
    CallbackOutcome, CallbackRejection, PaymentBoard, PaymentListener, PaymentService,
};
pub use printer::{
    CaptureTransport, DeviceFileTransport, PrintJob, PrintService, PrinterTransport, MAX_COPIES,
};
pub use rate_limit::{RateDecision, RateLimiter};
pub use storage::{FirebaseStore, InMemoryStore, ObjectStore};
