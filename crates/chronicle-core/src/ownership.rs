//! Ownership gate - who may mutate a post or comment.
//!
//! A denied mutation is not an error page: non-owners are sent back to
//! the resource's detail view, anonymous viewers to the login entry
//! point. Handlers translate [`MutationCheck`] into the matching
//! redirect.

use uuid::Uuid;

use crate::viewer::Viewer;

/// Outcome of an attempted mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationCheck {
    Allowed,
    /// Anonymous viewer: send to login.
    RedirectToLogin,
    /// Authenticated non-owner: send to the resource's detail view.
    RedirectToDetail,
}

/// True iff the viewer is authenticated and owns the resource.
pub fn can_mutate(viewer: &Viewer, resource_author_id: Uuid) -> bool {
    viewer.owns(resource_author_id)
}

/// Gate an edit/delete attempt against a resource's author.
pub fn check_mutation(viewer: &Viewer, resource_author_id: Uuid) -> MutationCheck {
    match viewer {
        Viewer::Anonymous => MutationCheck::RedirectToLogin,
        Viewer::User(id) if *id == resource_author_id => MutationCheck::Allowed,
        Viewer::User(_) => MutationCheck::RedirectToDetail,
    }
}

/// Gate a create attempt: creation only requires authentication, the
/// caller then stamps the author from the verified identity.
pub fn check_creation(viewer: &Viewer) -> MutationCheck {
    match viewer {
        Viewer::Anonymous => MutationCheck::RedirectToLogin,
        Viewer::User(_) => MutationCheck::Allowed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_may_mutate() {
        let author = Uuid::new_v4();
        assert!(can_mutate(&Viewer::User(author), author));
        assert_eq!(
            check_mutation(&Viewer::User(author), author),
            MutationCheck::Allowed
        );
    }

    #[test]
    fn non_owner_is_redirected_to_detail() {
        let author = Uuid::new_v4();
        let other = Viewer::User(Uuid::new_v4());
        assert!(!can_mutate(&other, author));
        assert_eq!(check_mutation(&other, author), MutationCheck::RedirectToDetail);
    }

    #[test]
    fn anonymous_is_redirected_to_login() {
        let author = Uuid::new_v4();
        assert!(!can_mutate(&Viewer::Anonymous, author));
        assert_eq!(
            check_mutation(&Viewer::Anonymous, author),
            MutationCheck::RedirectToLogin
        );
        assert_eq!(
            check_creation(&Viewer::Anonymous),
            MutationCheck::RedirectToLogin
        );
    }

    #[test]
    fn any_authenticated_viewer_may_create() {
        assert_eq!(
            check_creation(&Viewer::User(Uuid::new_v4())),
            MutationCheck::Allowed
        );
    }
}
