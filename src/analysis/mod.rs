// Analysis module: symbol records and member extraction

pub mod members;
pub mod records;

pub use members::{members, Holder, MemberKind};
pub use records::{ClassRecord, FunctionRecord, SymbolRecord};
