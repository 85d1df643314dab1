pub mod books;
pub mod circulation;
pub mod members;
pub mod reservations;
pub mod suspensions;

pub use books::BookRepository as PostgresBookRepository;
pub use circulation::CirculationStore as PostgresCirculationStore;
pub use members::MemberRepository as PostgresMemberRepository;
pub use reservations::ReservationStore as PostgresReservationStore;
pub use suspensions::SuspensionStore as PostgresSuspensionStore;

use crate::ports::Result;
use sqlx::{Row, postgres::PgRow};
use std::str::FromStr;

fn invalid_data(message: String) -> Box<dyn std::error::Error + Send + Sync> {
    Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, message))
}

/// Reads a text column into a domain enum
fn parse_column<T>(row: &PgRow, column: &str) -> Result<T>
where
    T: FromStr<Err = String>,
{
    let raw: String = row.try_get(column)?;
    T::from_str(raw.trim()).map_err(invalid_data)
}

/// Nullable variant of `parse_column`
fn parse_optional_column<T>(row: &PgRow, column: &str) -> Result<Option<T>>
where
    T: FromStr<Err = String>,
{
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|s| T::from_str(s.trim()).map_err(invalid_data))
        .transpose()
}

/// True when `err` is a unique violation of the named constraint or index
fn violates(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            db.is_unique_violation() && db.constraint() == Some(constraint)
        }
        _ => false,
    }
}
