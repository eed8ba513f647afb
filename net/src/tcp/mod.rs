pub mod receiver;
pub mod segment;
pub mod sender;

pub use receiver::TcpReceiver;
pub use segment::{TcpReceiverMessage, TcpSenderMessage, MAX_PAYLOAD_SIZE};
pub use sender::{SenderState, TcpSender};
