//! Built-in brick implementations.

pub mod collect;
pub mod diode;
pub mod filter;
pub mod hub;
pub mod nop;
pub mod print;
pub mod queue;
pub mod rxtx;

pub use collect::Collect;
pub use diode::Diode;
pub use filter::Filter;
pub use hub::Hub;
pub use nop::Nop;
pub use print::{Print, PrintFlags};
pub use queue::{are_friends, friend, unfriend, Queue};
pub use rxtx::{Rxtx, RxCallback, TxCallback};
