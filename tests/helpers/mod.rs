pub mod db;
pub mod fakes;

pub use db::TestDb;
pub use fakes::{FakeDirectory, FakeInventory};
