pub mod account;
pub mod catalog;
pub mod circulation;
mod errors;
pub mod members;
pub mod payments;
pub mod reports;
pub mod reservations;
pub mod suspension;
pub mod time_control;

pub use errors::{LibraryError, Result};

use crate::domain::{Book, BookId, CirculationPolicy, Member, MemberId};
use crate::ports::{
    BookRepository, CirculationStore, Clock, MemberRepository, ReservationStore,
    SuspensionStore, TimeControl,
};
use std::sync::Arc;

/// Everything a use case may touch.
///
/// Plain data: use cases are free functions that receive it by reference,
/// so every dependency is visible at the call site.
#[derive(Clone)]
pub struct ServiceDependencies {
    pub clock: Arc<dyn Clock>,
    pub time_control: Arc<dyn TimeControl>,
    pub policy: CirculationPolicy,
    pub books: Arc<dyn BookRepository>,
    pub members: Arc<dyn MemberRepository>,
    pub circulation: Arc<dyn CirculationStore>,
    pub reservations: Arc<dyn ReservationStore>,
    pub suspensions: Arc<dyn SuspensionStore>,
}

/// Loads a book or fails with `BookNotFound`
pub(crate) async fn load_book(deps: &ServiceDependencies, book_id: BookId) -> Result<Book> {
    deps.books
        .get_by_id(book_id)
        .await
        .map_err(LibraryError::Storage)?
        .ok_or(LibraryError::BookNotFound)
}

/// Loads a member or fails with `MemberNotFound`
pub(crate) async fn load_member(deps: &ServiceDependencies, member_id: MemberId) -> Result<Member> {
    deps.members
        .get_by_id(member_id)
        .await
        .map_err(LibraryError::Storage)?
        .ok_or(LibraryError::MemberNotFound)
}
