//! Browsing state: provider, breadcrumb, listing, sort and filters
//!
//! The breadcrumb is the actual navigation stack of directories entered
//! below the provider root. Jumping to an ancestor truncates it; nothing is
//! inferred by comparing the current directory against earlier entries.
//!
//! With a [`DirectoryMonitor`] attached, every change of directory drops the
//! subscription on the directory being left and subscribes to the new one;
//! [`NavigationState::next_update`] feeds its listings into the state.

use filecast_core::domain::{
    sort_listing, ContentType, FileItem, ItemId, ProviderId, SortOrder,
};
use filecast_core::{ErrorKind, ProviderError, ProviderResult};
use tracing::{debug, warn};

use crate::monitor::{DirectoryMonitor, DirectorySubscription};
use crate::router::ProviderRouter;

/// Breadcrumb index meaning "the provider root"
pub const ROOT_INDEX: usize = usize::MAX;

#[derive(Debug)]
pub struct NavigationState {
    provider: ProviderId,
    breadcrumb: Vec<FileItem>,
    listing: Vec<FileItem>,
    sort: SortOrder,
    filter: Option<ContentType>,
    search_text: String,
    monitor: Option<DirectoryMonitor>,
    subscription: Option<DirectorySubscription>,
}

impl Default for NavigationState {
    fn default() -> Self {
        Self::new(ProviderId::local())
    }
}

impl NavigationState {
    pub fn new(provider: ProviderId) -> Self {
        Self {
            provider,
            breadcrumb: Vec::new(),
            listing: Vec::new(),
            sort: SortOrder::default(),
            filter: None,
            search_text: String::new(),
            monitor: None,
            subscription: None,
        }
    }

    /// Keep the current directory watched by `monitor`
    #[must_use]
    pub fn with_monitor(mut self, monitor: DirectoryMonitor) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// Whether a live subscription follows the current directory
    pub fn is_watching(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn provider(&self) -> &ProviderId {
        &self.provider
    }

    /// Directories entered below the root, outermost first
    pub fn breadcrumb(&self) -> &[FileItem] {
        &self.breadcrumb
    }

    /// Current directory; `None` at the provider root
    pub fn current_directory(&self) -> Option<&FileItem> {
        self.breadcrumb.last()
    }

    pub fn current_directory_id(&self) -> Option<&ItemId> {
        self.current_directory().map(FileItem::id)
    }

    /// Unfiltered listing of the current directory
    pub fn listing(&self) -> &[FileItem] {
        &self.listing
    }

    /// `/`-joined breadcrumb names, for display
    pub fn path_display(&self) -> String {
        let names: Vec<&str> = self.breadcrumb.iter().map(FileItem::name).collect();
        format!("/{}", names.join("/"))
    }

    /// Switch provider and show its root
    pub async fn open_provider(
        &mut self,
        router: &ProviderRouter,
        provider: ProviderId,
    ) -> ProviderResult<()> {
        let listing = router.contents(None, &provider).await?;
        self.provider = provider;
        self.breadcrumb.clear();
        self.listing = listing;
        self.watch_current();
        Ok(())
    }

    /// Descend into `directory`
    pub async fn enter(&mut self, router: &ProviderRouter, directory: FileItem) -> ProviderResult<()> {
        if !directory.is_directory() || directory.provider_id() != &self.provider {
            return Err(ProviderError::new(
                ErrorKind::OperationNotSupported,
                format!("{} is not a directory of {}", directory.name(), self.provider),
            ));
        }
        let listing = router.contents(Some(directory.id()), &self.provider).await?;
        self.breadcrumb.push(directory);
        self.listing = listing;
        self.watch_current();
        Ok(())
    }

    /// Go to the parent directory; returns false when already at the root
    pub async fn go_up(&mut self, router: &ProviderRouter) -> ProviderResult<bool> {
        if self.breadcrumb.is_empty() {
            return Ok(false);
        }
        let depth = self.breadcrumb.len() - 1;
        self.load_depth(router, depth).await?;
        Ok(true)
    }

    /// Jump to breadcrumb entry `index` ([`ROOT_INDEX`] for the root),
    /// dropping everything after it
    pub async fn navigate_to_ancestor(
        &mut self,
        router: &ProviderRouter,
        index: usize,
    ) -> ProviderResult<()> {
        let depth = if index == ROOT_INDEX {
            0
        } else if index < self.breadcrumb.len() {
            index + 1
        } else {
            return Err(ProviderError::new(
                ErrorKind::OperationFailed,
                format!("no breadcrumb entry {index}"),
            ));
        };
        self.load_depth(router, depth).await
    }

    /// Reload the current directory
    pub async fn refresh(&mut self, router: &ProviderRouter) -> ProviderResult<()> {
        self.listing = router
            .contents(self.current_directory_id(), &self.provider)
            .await?;
        Ok(())
    }

    /// Replace the listing with a monitor update for the current directory
    pub fn apply_listing(&mut self, listing: &[FileItem]) {
        self.listing = listing.to_vec();
    }

    /// Wait for the monitor to report a change and apply it
    ///
    /// Returns `None` when nothing is watched. A poll failure is returned
    /// once and ends the watch; navigating again starts a new one.
    pub async fn next_update(&mut self) -> Option<ProviderResult<()>> {
        let subscription = self.subscription.as_mut()?;
        match subscription.next().await {
            Some(Ok(listing)) => {
                self.apply_listing(&listing);
                Some(Ok(()))
            }
            Some(Err(e)) => {
                self.subscription = None;
                Some(Err(e))
            }
            None => {
                self.subscription = None;
                None
            }
        }
    }

    pub fn sort(&self) -> SortOrder {
        self.sort
    }

    pub fn set_sort(&mut self, sort: SortOrder) {
        self.sort = sort;
    }

    pub fn filter(&self) -> Option<ContentType> {
        self.filter
    }

    pub fn set_filter(&mut self, filter: Option<ContentType>) {
        self.filter = filter;
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub fn set_search_text(&mut self, text: impl Into<String>) {
        self.search_text = text.into();
    }

    /// Listing after the content-type filter, the search text and the sort
    /// order. Directories survive the content-type filter so the tree stays
    /// navigable.
    pub fn visible_items(&self) -> Vec<FileItem> {
        let needle = self.search_text.trim().to_lowercase();
        let mut items: Vec<FileItem> = self
            .listing
            .iter()
            .filter(|item| match self.filter {
                Some(wanted) => item.is_directory() || item.content_type() == Some(wanted),
                None => true,
            })
            .filter(|item| needle.is_empty() || item.name().to_lowercase().contains(&needle))
            .cloned()
            .collect();
        sort_listing(&mut items, self.sort);
        items
    }

    /// Keep the first `depth` breadcrumb entries and load the result
    async fn load_depth(&mut self, router: &ProviderRouter, depth: usize) -> ProviderResult<()> {
        let target = depth.checked_sub(1).map(|i| self.breadcrumb[i].id());
        let listing = router.contents(target, &self.provider).await?;
        self.breadcrumb.truncate(depth);
        self.listing = listing;
        self.watch_current();
        Ok(())
    }

    /// Move the subscription to the current directory
    fn watch_current(&mut self) {
        // Release the directory being left before joining the next one
        self.subscription = None;
        let Some(monitor) = &self.monitor else {
            return;
        };
        match monitor.subscribe(&self.provider, self.current_directory_id()) {
            Ok(subscription) => {
                debug!(key = %subscription.key(), "Following directory");
                self.subscription = Some(subscription);
            }
            Err(e) => warn!(provider = %self.provider, error = %e, "Cannot watch directory"),
        }
    }
}
