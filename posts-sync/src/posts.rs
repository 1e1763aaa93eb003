use crate::diff::{self, Diff};
use crate::error::SyncError;
use crate::models::{CreatePostRequest, CreatePostResponse, Post, PostsPage};
use crate::notify::Notification;
use crate::pagination::{self, Pagination};
use crate::store;
use crate::transport::Method;
use crate::SyncContext;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const POSTS_STORE_KEY: &str = "posts";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostsState {
    /// Current page, replaced wholesale by every successful fetch.
    pub posts: Vec<Post>,
    /// Working buffer: the record being created or edited.
    pub data: Post,
    /// Snapshot of `data` taken at load time; the diff baseline.
    pub data_old: Post,
    /// Selection, consumed back to front by bulk delete.
    pub selected: Vec<Post>,
    pub pagination: Pagination,
    pub filter: String,
    pub is_loading: bool,
}

/// Outcome of [`PostsManager::delete_selected`]. Each deletion is independent.
#[derive(Debug, Default)]
pub struct DeleteReport {
    pub deleted: Vec<String>,
    pub failed: Vec<(Option<String>, SyncError)>,
}

impl DeleteReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Owns the current page of posts and the edit/selection buffers.
pub struct PostsManager {
    ctx: SyncContext,
    state: PostsState,
}

impl PostsManager {
    pub fn new(ctx: SyncContext) -> Self {
        let mut state: PostsState = store::load_state(ctx.store.as_ref(), POSTS_STORE_KEY);
        state.is_loading = false;
        Self { ctx, state }
    }

    pub fn state(&self) -> &PostsState {
        &self.state
    }

    pub fn posts(&self) -> &[Post] {
        &self.state.posts
    }

    pub fn data(&self) -> &Post {
        &self.state.data
    }

    pub fn selected(&self) -> &[Post] {
        &self.state.selected
    }

    pub fn pagination(&self) -> &Pagination {
        &self.state.pagination
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading
    }

    // ==================== Буферы ====================

    pub fn set_data(&mut self, data: Post) {
        self.state.data = data;
        self.persist();
    }

    /// Edits the working buffer in place; the snapshot is left alone.
    pub fn edit_data(&mut self, edit: impl FnOnce(&mut Post)) {
        edit(&mut self.state.data);
        self.persist();
    }

    pub fn select(&mut self, posts: Vec<Post>) {
        self.state.selected = posts;
        self.persist();
    }

    pub fn clear_selection(&mut self) {
        self.state.selected.clear();
        self.persist();
    }

    pub fn set_filter(&mut self, filter: impl Into<String>) {
        self.state.filter = filter.into();
        self.persist();
    }

    /// Updates the client-authored part of the pagination. `rows_number` is
    /// left untouched; a zero page size is bumped to one.
    pub fn set_pagination(
        &mut self,
        page: u32,
        rows_per_page: u32,
        sort_by: impl Into<String>,
        descending: bool,
    ) {
        let pagination = &mut self.state.pagination;
        pagination.page = page;
        pagination.rows_per_page = rows_per_page.max(1);
        pagination.sort_by = sort_by.into();
        pagination.descending = descending;
        self.persist();
    }

    // ==================== Операции ====================

    /// Fetches the working buffer's record by id and snapshots it.
    /// Without an id this is a no-op returning `Ok(None)`.
    pub async fn load_one(&mut self) -> Result<Option<Post>, SyncError> {
        let Some(id) = self.state.data.id.clone() else {
            tracing::debug!("load_one skipped: working buffer has no id");
            return Ok(None);
        };

        self.begin();
        let result = self.fetch_post(&id).await;
        match &result {
            Ok(post) => {
                self.state.data = post.clone();
                self.state.data_old = post.clone();
                self.persist();
            }
            Err(e) => {
                tracing::warn!("Failed to load post {}: {}", id, e);
                self.ctx.notify(Notification::negative(format!(
                    "Error while getting post by id: {}",
                    e
                )));
            }
        }
        self.finish();

        result.map(Some)
    }

    /// Creates a post from the working buffer's title and content, then
    /// refreshes the page whatever the outcome.
    pub async fn create_one(&mut self) -> Result<Post, SyncError> {
        self.begin();

        let request = CreatePostRequest {
            title: self.state.data.title.clone(),
            content: self.state.data.content.clone(),
        };
        let result = self.send_create(request).await;
        match &result {
            Ok(post) => {
                let id = post.id.as_deref().unwrap_or_default();
                tracing::info!("Post created: id={}", id);
                self.ctx.notify(Notification::positive(format!(
                    "Post with id={} has been created successfully!",
                    id
                )));
            }
            Err(e) => {
                tracing::warn!("Failed to create post: {}", e);
                self.ctx
                    .notify(Notification::negative(format!("Error in create post: {}", e)));
            }
        }

        self.refresh_after_mutation().await;
        self.finish();
        result
    }

    /// Sends only the fields changed since [`load_one`](Self::load_one) as a
    /// partial update. An empty diff never reaches the network.
    pub async fn update_one(&mut self) -> Result<Post, SyncError> {
        let Some(id) = self.state.data.id.clone() else {
            self.ctx.notify(Notification::negative(
                "Nothing to update: the post has no id",
            ));
            return Err(SyncError::MissingId);
        };

        let changes = diff::diff(&self.state.data, &self.state.data_old)?;
        if changes.is_empty() {
            self.ctx.notify(Notification::negative("Nothing changed!"));
            return Err(SyncError::NothingChanged);
        }

        self.begin();
        tracing::debug!("Patching post {} with {} field(s)", id, changes.len());
        let result = self.send_patch(&id, changes).await;
        match &result {
            Ok(post) => {
                match self.state.selected.first_mut() {
                    Some(first) => *first = post.clone(),
                    None => self.state.selected.push(post.clone()),
                }
                tracing::info!("Post updated: id={}", id);
                self.ctx.notify(Notification::positive(format!(
                    "Post with id={} has been edited successfully!",
                    id
                )));
            }
            Err(e) => {
                tracing::warn!("Failed to update post {}: {}", id, e);
                self.ctx.notify(Notification::negative(format!(
                    "Error while editing post {}: {}",
                    id, e
                )));
            }
        }
        self.state.data = Post::default();
        self.state.data_old = Post::default();
        self.persist();

        self.refresh_after_mutation().await;
        self.finish();
        result
    }

    /// Deletes the selection back to front, one request at a time, then
    /// refreshes once. A failed deletion does not stop the rest.
    pub async fn delete_selected(&mut self) -> DeleteReport {
        let mut report = DeleteReport::default();
        if self.state.selected.is_empty() {
            return report;
        }

        self.begin();
        while let Some(post) = self.state.selected.pop() {
            self.persist();

            let Some(id) = post.id else {
                self.ctx.notify(Notification::negative(
                    "Cannot delete a post without id",
                ));
                report.failed.push((None, SyncError::MissingId));
                continue;
            };

            let result = self
                .ctx
                .transport
                .request(Method::DELETE, &format!("posts/{}", id), None)
                .await;
            match result {
                Ok(_) => {
                    tracing::info!("Post deleted: id={}", id);
                    self.ctx.notify(Notification::positive(format!(
                        "Document with id={} has been deleted successfully!",
                        id
                    )));
                    report.deleted.push(id);
                }
                Err(e) => {
                    tracing::warn!("Failed to delete post {}: {}", id, e);
                    self.ctx.notify(Notification::negative(format!(
                        "Error while deleting post {}: {}",
                        id, e
                    )));
                    report.failed.push((Some(id), e));
                }
            }
        }

        self.refresh_after_mutation().await;
        self.finish();
        report
    }

    /// Fetches the page described by the current pagination and filter.
    /// On failure the last good list stays in place.
    pub async fn refresh_page(&mut self) -> Result<(), SyncError> {
        self.begin();

        let result = self.fetch_page().await;
        let outcome = match result {
            Ok(page) => {
                tracing::debug!("Fetched {} of {} posts", page.posts.len(), page.count);
                self.state.posts = page.posts;
                self.state.pagination.rows_number = page.count;
                self.persist();
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Failed to fetch posts: {}", e);
                self.ctx.notify(Notification::negative(e.to_string()));
                Err(e)
            }
        };

        self.finish();
        outcome
    }

    async fn refresh_after_mutation(&mut self) {
        // refresh_page reports its own failure
        if let Err(e) = self.refresh_page().await {
            tracing::debug!("Refresh after mutation failed: {}", e);
        }
    }

    async fn fetch_post(&self, id: &str) -> Result<Post, SyncError> {
        let value = self
            .ctx
            .transport
            .request(Method::GET, &format!("posts/{}", id), None)
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn send_create(&self, request: CreatePostRequest) -> Result<Post, SyncError> {
        let body = serde_json::to_value(request)?;
        let value = self
            .ctx
            .transport
            .request(Method::POST, "posts", Some(body))
            .await?;
        let response: CreatePostResponse = serde_json::from_value(value)?;
        if response.post.id.is_none() {
            return Err(SyncError::MissingId);
        }
        Ok(response.post)
    }

    async fn send_patch(&self, id: &str, changes: Diff) -> Result<Post, SyncError> {
        let value = self
            .ctx
            .transport
            .request(
                Method::PATCH,
                &format!("posts/{}", id),
                Some(Value::Object(changes)),
            )
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn fetch_page(&self) -> Result<PostsPage, SyncError> {
        let locator = pagination::encode(&self.state.pagination, &self.state.filter);
        let value = self
            .ctx
            .transport
            .request(Method::GET, &locator.path(), None)
            .await?;
        pagination::decode(value)
    }

    fn begin(&mut self) {
        self.ctx.busy.show();
        self.state.is_loading = true;
        self.persist();
    }

    fn finish(&mut self) {
        self.ctx.busy.hide();
        self.state.is_loading = false;
        self.persist();
    }

    fn persist(&self) {
        store::persist(self.ctx.store.as_ref(), POSTS_STORE_KEY, &self.state);
    }
}
