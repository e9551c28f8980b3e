mod database;
mod marvelcdb;
mod octgn_db;
mod types;

pub use database::{LocalCardDatabase, RemoteCardDatabase, import_local_deck, import_remote_deck};
pub use marvelcdb::{MARVELCDB_URL, MarvelCdbClient, PendingRecord, record_from_json};
pub use octgn_db::OctgnDatabase;
pub use types::*;
