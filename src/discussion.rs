//! The comment section of one post.
//!
//! Request state such as "loading" or "failed" is not tracked here. Every
//! operation returns a [`Result`] and the caller decides what to hold on to.

use tracing::instrument;

use crate::{
    domain::{
        CollapsedSet, Comment, CommentId, Forest, ForestStats, NewComment, PostId, Snapshot,
    },
    storage::{AuthProvider, CommentStore, FetchError, InsertError},
};

/// Fetches a post's comments and builds their reply forest.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
#[instrument(level = "debug", skip(store))]
pub fn fetch_forest<S>(store: &S, post: PostId) -> Result<Forest, FetchError>
where
    S: CommentStore + ?Sized,
{
    let comments = store.comments_for_post(post)?;
    Ok(Forest::build(&comments))
}

/// Submits a comment, or a reply when `parent` is given, on behalf of the
/// signed-in user.
///
/// # Errors
///
/// - [`SubmitError::Unauthenticated`] if nobody is signed in
/// - [`SubmitError::EmptyContent`] if `content` is blank
/// - [`SubmitError::Insert`] if the store rejects the comment
#[instrument(skip(store, auth, content))]
pub fn submit_comment<S, A>(
    store: &mut S,
    auth: &A,
    post: PostId,
    parent: Option<CommentId>,
    content: &str,
) -> Result<Comment, SubmitError>
where
    S: CommentStore + ?Sized,
    A: AuthProvider + ?Sized,
{
    let identity = auth.current_user().ok_or(SubmitError::Unauthenticated)?;

    let content = content.trim();
    if content.is_empty() {
        return Err(SubmitError::EmptyContent);
    }

    let comment = store.insert(NewComment {
        post_id: post,
        content: content.to_string(),
        parent_comment_id: parent,
        user_id: identity.user_id().clone(),
        author: identity.author().to_string(),
    })?;

    Ok(comment)
}

/// Errors that can occur when submitting a comment.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// Nobody is signed in.
    #[error("sign in to comment")]
    Unauthenticated,

    /// The comment has no content.
    #[error("comment must not be empty")]
    EmptyContent,

    /// The store rejected the comment.
    #[error(transparent)]
    Insert(#[from] InsertError),

    /// The comment was stored but the discussion could not be refreshed.
    #[error("comment stored but refresh failed")]
    Refresh(#[source] FetchError),
}

/// What a [`Discussion::refresh`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The fetched comments matched the previous fetch, so the forest was
    /// kept.
    Unchanged,
    /// The comments changed and the forest was rebuilt from scratch.
    Rebuilt,
}

/// The live comment section of a single post.
///
/// Holds the most recent forest and the collapsed state of its threads.
/// Every change in the fetched comments triggers a full rebuild; there is no
/// incremental update.
#[derive(Debug, Clone)]
pub struct Discussion {
    post: PostId,
    fingerprint: Option<String>,
    forest: Forest,
    collapsed: CollapsedSet,
}

impl Discussion {
    /// An empty discussion for `post`. Call [`Self::refresh`] to load it.
    #[must_use]
    pub fn new(post: PostId) -> Self {
        Self {
            post,
            fingerprint: None,
            forest: Forest::default(),
            collapsed: CollapsedSet::default(),
        }
    }

    /// The post this discussion belongs to.
    #[must_use]
    pub const fn post(&self) -> PostId {
        self.post
    }

    /// The current reply forest.
    #[must_use]
    pub const fn forest(&self) -> &Forest {
        &self.forest
    }

    /// Threads whose replies are hidden.
    #[must_use]
    pub const fn collapsed(&self) -> &CollapsedSet {
        &self.collapsed
    }

    /// Mutable access to the collapsed threads.
    pub const fn collapsed_mut(&mut self) -> &mut CollapsedSet {
        &mut self.collapsed
    }

    /// Counts for the current forest.
    #[must_use]
    pub fn stats(&self) -> ForestStats {
        ForestStats::from(&self.forest)
    }

    /// Re-fetches the comments and rebuilds the forest if they changed.
    ///
    /// Collapsed ids that no longer exist are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read. The previous forest is
    /// kept in that case.
    #[instrument(level = "debug", skip(self, store), fields(post = %self.post))]
    pub fn refresh<S>(&mut self, store: &S) -> Result<RefreshOutcome, FetchError>
    where
        S: CommentStore + ?Sized,
    {
        let snapshot = Snapshot::new(store.comments_for_post(self.post)?);

        if self.fingerprint.as_deref() == Some(snapshot.fingerprint()) {
            return Ok(RefreshOutcome::Unchanged);
        }

        self.forest = snapshot.forest();
        self.collapsed.retain_present(&self.forest);
        self.fingerprint = Some(snapshot.fingerprint().to_string());

        tracing::debug!(
            total = self.forest.total_comments(),
            roots = self.forest.root_comments(),
            "rebuilt comment forest"
        );

        Ok(RefreshOutcome::Rebuilt)
    }

    /// Submits a comment or reply to this post and refreshes the forest.
    ///
    /// # Errors
    ///
    /// See [`submit_comment`]. If the comment was stored but the refresh
    /// failed, [`SubmitError::Refresh`] is returned.
    pub fn submit<S, A>(
        &mut self,
        store: &mut S,
        auth: &A,
        parent: Option<CommentId>,
        content: &str,
    ) -> Result<Comment, SubmitError>
    where
        S: CommentStore + ?Sized,
        A: AuthProvider + ?Sized,
    {
        let comment = submit_comment(store, auth, self.post, parent, content)?;
        self.refresh(store).map_err(SubmitError::Refresh)?;
        Ok(comment)
    }
}
