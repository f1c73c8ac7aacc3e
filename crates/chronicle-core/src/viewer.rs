//! Viewer identity - who is making the current request.

use uuid::Uuid;

/// The identity a request is evaluated against.
///
/// Authorization compares author ids, never usernames: the canonical
/// equality rule is `authenticated user id == resource author id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    Anonymous,
    User(Uuid),
}

impl Viewer {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Viewer::User(_))
    }

    /// The authenticated author id, if any.
    pub fn author_id(&self) -> Option<Uuid> {
        match self {
            Viewer::Anonymous => None,
            Viewer::User(id) => Some(*id),
        }
    }

    /// Whether this viewer owns a resource with the given author id.
    pub fn owns(&self, author_id: Uuid) -> bool {
        self.author_id() == Some(author_id)
    }
}
