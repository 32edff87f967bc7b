//! Application state and logic
//!
//! Manager calls are spawned and never awaited by the UI loop. Each task
//! reports back on a channel once its call settles, and [`App::tick`] reads
//! the manager state to decide what happens next.

use std::future::Future;
use std::sync::Arc;

use bsa_core::renewal::SESSION_EXPIRED;
use bsa_core::{
    describe_error, ApiClient, Brand, BrandManager, Category, CategoryManager, Config,
    DashboardManager, ListQuery, Product, ProductManager, RequestState, SessionManager,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::form::{AuthForm, Choice, FormError, RecordForm, RecordKind};

/// Error code the API returns for an unknown record id
const NOT_FOUND: &str = "not_found";

/// Application result for main loop
pub enum AppResult {
    Continue,
    Quit,
}

/// Top-level screens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Auth,
    Home,
    Records(RecordKind),
}

impl Screen {
    /// Screens reachable with Tab once logged in
    pub const TABS: [Screen; 4] = [
        Screen::Home,
        Screen::Records(RecordKind::Product),
        Screen::Records(RecordKind::Category),
        Screen::Records(RecordKind::Brand),
    ];

    pub fn title(self) -> &'static str {
        match self {
            Screen::Auth => "Sign in",
            Screen::Home => "Home",
            Screen::Records(RecordKind::Product) => "Products",
            Screen::Records(RecordKind::Category) => "Categories",
            Screen::Records(RecordKind::Brand) => "Brands",
        }
    }
}

/// What the keyboard is currently driving
#[derive(Debug, Clone)]
pub enum InputMode {
    Normal,
    Detail,
    /// Editing the product name search
    Search(String),
    Form(RecordForm),
    Confirm { kind: RecordKind, id: String, name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetailRecord {
    Product(Product),
    Category(Category),
    Brand(Brand),
}

/// What the detail panel shows for the requested id
#[derive(Debug, Clone, PartialEq)]
pub enum DetailView {
    Loading,
    Found(DetailRecord),
    NotFound,
    Failed(String),
}

/// The record opened in the detail panel
#[derive(Debug, Clone, PartialEq)]
pub struct Detail {
    pub kind: RecordKind,
    pub id: String,
    pub view: DetailView,
}

/// A settled manager call
#[derive(Debug, Clone, PartialEq, Eq)]
enum Settled {
    Auth,
    Stats,
    Listed(RecordKind),
    Detail(RecordKind, String),
    Saved(RecordKind),
    Deleted(RecordKind),
}

trait Identified {
    fn record_id(&self) -> &str;
}

impl Identified for Product {
    fn record_id(&self) -> &str {
        &self.id
    }
}

impl Identified for Category {
    fn record_id(&self) -> &str {
        &self.id
    }
}

impl Identified for Brand {
    fn record_id(&self) -> &str {
        &self.id
    }
}

/// Main application struct
pub struct App {
    pub config: Config,

    pub session: Arc<SessionManager>,
    pub dashboard: Arc<DashboardManager>,
    pub products: Arc<ProductManager>,
    pub categories: Arc<CategoryManager>,
    pub brands: Arc<BrandManager>,

    pub screen: Screen,
    pub input_mode: InputMode,
    pub auth_form: AuthForm,

    /// Row under the cursor on list screens
    pub cursor: usize,

    /// Current product page, 1-based
    pub page: u32,

    /// Product name search, empty for none
    pub product_search: String,

    /// Category id the product list is narrowed to
    pub category_filter: Option<String>,

    pub detail: Option<Detail>,

    pub status_message: Option<(String, StatusLevel)>,

    settled_tx: mpsc::UnboundedSender<Settled>,
    settled_rx: mpsc::UnboundedReceiver<Settled>,
}

impl App {
    pub fn new(config: Config, client: ApiClient) -> Self {
        let (settled_tx, settled_rx) = mpsc::unbounded_channel();
        let session = Arc::new(SessionManager::new(client.clone()));
        let screen = if session.is_logged_in() {
            Screen::Home
        } else {
            Screen::Auth
        };

        let app = Self {
            config,
            session,
            dashboard: Arc::new(DashboardManager::new(client.clone())),
            products: Arc::new(ProductManager::new(client.clone())),
            categories: Arc::new(CategoryManager::new(client.clone())),
            brands: Arc::new(BrandManager::new(client)),
            screen,
            input_mode: InputMode::Normal,
            auth_form: AuthForm::login(),
            cursor: 0,
            page: 1,
            product_search: String::new(),
            category_filter: None,
            detail: None,
            status_message: None,
            settled_tx,
            settled_rx,
        };

        if app.screen == Screen::Home {
            info!("Resuming stored session");
            app.refresh_stats();
        }
        app
    }

    pub fn set_status(&mut self, msg: impl Into<String>, level: StatusLevel) {
        self.status_message = Some((msg.into(), level));
    }

    pub fn clear_status(&mut self) {
        self.status_message = None;
    }

    fn spawn<F>(&self, call: F, settled: Settled)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let tx = self.settled_tx.clone();
        tokio::spawn(async move {
            call.await;
            let _ = tx.send(settled);
        });
    }

    /// Process settled manager calls
    pub fn tick(&mut self) {
        while let Ok(settled) = self.settled_rx.try_recv() {
            self.handle_settled(settled);
        }
    }

    fn handle_settled(&mut self, settled: Settled) {
        debug!(?settled, "Call settled");

        // Renewal may have replaced or erased the stored session
        let was_logged_in = self.session.is_logged_in();
        self.session.sync();
        if was_logged_in && !self.session.is_logged_in() {
            warn!("Session could not be renewed");
            self.logout();
            self.set_status(describe_error(SESSION_EXPIRED, None), StatusLevel::Error);
            return;
        }

        if self.screen == Screen::Auth && settled != Settled::Auth {
            debug!(?settled, "Ignoring call settled after logout");
            return;
        }
        self.on_settled(settled);
    }

    fn on_settled(&mut self, settled: Settled) {
        match settled {
            Settled::Auth => {
                let state = self.session.state();
                if let Some(code) = &state.error {
                    let msg = describe_error(code, state.error_objects.as_deref());
                    self.set_status(msg, StatusLevel::Error);
                } else if state.logged_in {
                    let name = state.user.map(|u| u.name).unwrap_or_default();
                    self.auth_form = AuthForm::login();
                    self.screen = Screen::Home;
                    self.set_status(format!("Welcome {}", name), StatusLevel::Success);
                    self.refresh_stats();
                }
            }
            Settled::Stats => {
                let state = self.dashboard.state();
                self.report_error(&state);
            }
            Settled::Listed(kind) => {
                if let Some(msg) = self.record_error(kind) {
                    self.set_status(msg, StatusLevel::Error);
                }
                self.clamp_cursor();
            }
            Settled::Detail(kind, id) => self.resolve_detail(kind, &id),
            Settled::Saved(kind) => {
                if let Some(msg) = self.record_error(kind) {
                    // Keep the form open so the input can be corrected
                    self.set_status(msg, StatusLevel::Error);
                } else if self.record_entity_set(kind) {
                    self.input_mode = InputMode::Normal;
                    self.set_status(format!("{} saved", kind.title()), StatusLevel::Success);
                    self.reload(kind);
                }
            }
            Settled::Deleted(kind) => {
                if let Some(msg) = self.record_error(kind) {
                    self.set_status(msg, StatusLevel::Error);
                } else if self.record_deleted(kind) {
                    self.set_status(format!("{} deleted", kind.title()), StatusLevel::Success);
                    self.reload(kind);
                }
            }
        }
    }

    fn report_error<T>(&mut self, state: &RequestState<T>) {
        if let Some(msg) = error_message(state) {
            self.set_status(msg, StatusLevel::Error);
        }
    }

    fn record_error(&self, kind: RecordKind) -> Option<String> {
        match kind {
            RecordKind::Product => error_message(&self.products.state()),
            RecordKind::Category => error_message(&self.categories.state()),
            RecordKind::Brand => error_message(&self.brands.state()),
        }
    }

    fn record_entity_set(&self, kind: RecordKind) -> bool {
        match kind {
            RecordKind::Product => self.products.state().entity.is_some(),
            RecordKind::Category => self.categories.state().entity.is_some(),
            RecordKind::Brand => self.brands.state().entity.is_some(),
        }
    }

    fn record_deleted(&self, kind: RecordKind) -> bool {
        match kind {
            RecordKind::Product => self.products.state().deleted_id.is_some(),
            RecordKind::Category => self.categories.state().deleted_id.is_some(),
            RecordKind::Brand => self.brands.state().deleted_id.is_some(),
        }
    }

    /// Number of rows on the current list screen
    pub fn row_count(&self) -> usize {
        match self.screen {
            Screen::Records(RecordKind::Product) => {
                self.products.state().entities.map_or(0, |e| e.len())
            }
            Screen::Records(RecordKind::Category) => {
                self.categories.state().entities.map_or(0, |e| e.len())
            }
            Screen::Records(RecordKind::Brand) => {
                self.brands.state().entities.map_or(0, |e| e.len())
            }
            _ => 0,
        }
    }

    fn clamp_cursor(&mut self) {
        let rows = self.row_count();
        if self.cursor >= rows {
            self.cursor = rows.saturating_sub(1);
        }
    }

    pub fn cursor_down(&mut self) {
        if self.cursor + 1 < self.row_count() {
            self.cursor += 1;
        }
    }

    pub fn cursor_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    /// Id and name of the row under the cursor
    fn selected(&self, kind: RecordKind) -> Option<(String, String)> {
        let cursor = self.cursor;
        match kind {
            RecordKind::Product => self
                .products
                .state()
                .entities?
                .get(cursor)
                .map(|p| (p.id.clone(), p.name.clone())),
            RecordKind::Category => self
                .categories
                .state()
                .entities?
                .get(cursor)
                .map(|c| (c.id.clone(), c.name.clone())),
            RecordKind::Brand => self
                .brands
                .state()
                .entities?
                .get(cursor)
                .map(|b| (b.id.clone(), b.name.clone())),
        }
    }

    // Authentication

    pub fn submit_auth(&mut self) {
        self.clear_status();
        match self.auth_request() {
            Ok(()) => self.set_status("Signing in...", StatusLevel::Info),
            Err(e) => self.set_status(e.to_string(), StatusLevel::Error),
        }
    }

    fn auth_request(&mut self) -> Result<(), FormError> {
        let email = self.auth_form.email()?;
        let password = self.auth_form.password()?;
        let session = Arc::clone(&self.session);

        if self.auth_form.register {
            let name = self.auth_form.name()?;
            self.spawn(
                async move { session.register(&name, &email, &password).await },
                Settled::Auth,
            );
        } else {
            self.spawn(
                async move { session.login(&email, &password).await },
                Settled::Auth,
            );
        }
        Ok(())
    }

    pub fn toggle_register(&mut self) {
        self.session.reset_errors();
        self.clear_status();
        self.auth_form.toggle();
    }

    pub fn logout(&mut self) {
        self.session.logout();
        self.screen = Screen::Auth;
        self.input_mode = InputMode::Normal;
        self.auth_form = AuthForm::login();
        self.cursor = 0;
        self.page = 1;
        self.product_search.clear();
        self.category_filter = None;
        self.detail = None;
        self.set_status("Logged out", StatusLevel::Info);
    }

    // Navigation

    pub fn show(&mut self, screen: Screen) {
        if self.screen == Screen::Auth || screen == Screen::Auth {
            return;
        }
        self.screen = screen;
        self.input_mode = InputMode::Normal;
        self.detail = None;
        self.cursor = 0;
        self.clear_status();
        self.refresh();
    }

    pub fn next_tab(&mut self) {
        let idx = Screen::TABS.iter().position(|s| *s == self.screen).unwrap_or(0);
        self.show(Screen::TABS[(idx + 1) % Screen::TABS.len()]);
    }

    /// Reload the current screen. The product screen also loads the
    /// category and brand lists used by its filter and form pickers.
    pub fn refresh(&mut self) {
        match self.screen {
            Screen::Home => self.refresh_stats(),
            Screen::Records(RecordKind::Product) => {
                self.reload(RecordKind::Product);
                self.reload(RecordKind::Category);
                self.reload(RecordKind::Brand);
            }
            Screen::Records(kind) => self.reload(kind),
            Screen::Auth => {}
        }
    }

    fn refresh_stats(&self) {
        let dashboard = Arc::clone(&self.dashboard);
        self.spawn(async move { dashboard.refresh().await }, Settled::Stats);
    }

    /// Query for the current product page, search and category filter
    pub fn product_query(&self) -> ListQuery {
        let mut query = ListQuery::new()
            .limit(self.config.client.page_size)
            .page(self.page);
        if !self.product_search.is_empty() {
            query = query.filter("name", self.product_search.as_str());
        }
        if let Some(category) = &self.category_filter {
            query = query.filter("category", category.as_str());
        }
        query
    }

    /// Reload the list for `kind`. Products are paginated.
    fn reload(&self, kind: RecordKind) {
        match kind {
            RecordKind::Product => {
                let query = self.product_query();
                let products = Arc::clone(&self.products);
                self.spawn(
                    async move { products.list(&query).await },
                    Settled::Listed(kind),
                );
            }
            RecordKind::Category => {
                let categories = Arc::clone(&self.categories);
                self.spawn(
                    async move { categories.list(&ListQuery::new().no_pagination()).await },
                    Settled::Listed(kind),
                );
            }
            RecordKind::Brand => {
                let brands = Arc::clone(&self.brands);
                self.spawn(
                    async move { brands.list(&ListQuery::new().no_pagination()).await },
                    Settled::Listed(kind),
                );
            }
        }
    }

    pub fn next_page(&mut self) {
        let has_next = self
            .products
            .state()
            .pagination
            .is_some_and(|p| p.has_next());
        if self.screen == Screen::Records(RecordKind::Product) && has_next {
            self.page += 1;
            self.cursor = 0;
            self.reload(RecordKind::Product);
        }
    }

    pub fn prev_page(&mut self) {
        if self.screen == Screen::Records(RecordKind::Product) && self.page > 1 {
            self.page -= 1;
            self.cursor = 0;
            self.reload(RecordKind::Product);
        }
    }

    // Product search and filter

    pub fn start_search(&mut self) {
        if self.screen == Screen::Records(RecordKind::Product) {
            self.input_mode = InputMode::Search(self.product_search.clone());
        }
    }

    pub fn apply_search(&mut self) {
        if let InputMode::Search(text) = &self.input_mode {
            self.product_search = text.trim().to_string();
            self.input_mode = InputMode::Normal;
            self.restart_products();
        }
    }

    pub fn cancel_search(&mut self) {
        self.input_mode = InputMode::Normal;
    }

    /// Step the category filter through the loaded categories, then off
    pub fn cycle_category_filter(&mut self) {
        if self.screen != Screen::Records(RecordKind::Product) {
            return;
        }
        let ids: Vec<String> = self
            .categories
            .state()
            .entities
            .unwrap_or_default()
            .into_iter()
            .map(|c| c.id)
            .collect();

        self.category_filter = match &self.category_filter {
            None => ids.first().cloned(),
            Some(current) => ids
                .iter()
                .position(|id| id == current)
                .and_then(|i| ids.get(i + 1))
                .cloned(),
        };
        self.restart_products();
    }

    pub fn clear_filters(&mut self) {
        if self.screen == Screen::Records(RecordKind::Product)
            && (!self.product_search.is_empty() || self.category_filter.is_some())
        {
            self.product_search.clear();
            self.category_filter = None;
            self.restart_products();
        }
    }

    /// Name of the category the product list is narrowed to
    pub fn category_filter_label(&self) -> Option<String> {
        let id = self.category_filter.as_ref()?;
        let name = self
            .categories
            .state()
            .entities
            .unwrap_or_default()
            .into_iter()
            .find(|c| &c.id == id)
            .map(|c| c.name);
        Some(name.unwrap_or_else(|| id.clone()))
    }

    fn restart_products(&mut self) {
        self.page = 1;
        self.cursor = 0;
        self.reload(RecordKind::Product);
    }

    // Records

    /// Load the selected record into the detail panel
    pub fn open_detail(&mut self) {
        let Screen::Records(kind) = self.screen else {
            return;
        };
        let Some((id, _)) = self.selected(kind) else {
            return;
        };

        self.detail = Some(Detail {
            kind,
            id: id.clone(),
            view: DetailView::Loading,
        });
        let settled = Settled::Detail(kind, id.clone());
        match kind {
            RecordKind::Product => {
                let m = Arc::clone(&self.products);
                self.spawn(async move { m.detail(&id).await }, settled);
            }
            RecordKind::Category => {
                let m = Arc::clone(&self.categories);
                self.spawn(async move { m.detail(&id).await }, settled);
            }
            RecordKind::Brand => {
                let m = Arc::clone(&self.brands);
                self.spawn(async move { m.detail(&id).await }, settled);
            }
        }
        self.input_mode = InputMode::Detail;
    }

    /// Settle the panel if it still shows the record this call loaded
    fn resolve_detail(&mut self, kind: RecordKind, id: &str) {
        let Some(detail) = self.detail.as_ref().filter(|d| d.kind == kind && d.id == id) else {
            return;
        };
        let kind = detail.kind;

        let view = match kind {
            RecordKind::Product => detail_view(&self.products.state(), id, DetailRecord::Product),
            RecordKind::Category => {
                detail_view(&self.categories.state(), id, DetailRecord::Category)
            }
            RecordKind::Brand => detail_view(&self.brands.state(), id, DetailRecord::Brand),
        };

        if let DetailView::Failed(msg) = &view {
            self.set_status(msg.clone(), StatusLevel::Error);
        }
        if let Some(detail) = self.detail.as_mut() {
            detail.view = view;
        }
    }

    pub fn close_detail(&mut self) {
        self.detail = None;
        self.input_mode = InputMode::Normal;
    }

    fn category_choices(&self) -> Vec<Choice> {
        self.categories
            .state()
            .entities
            .unwrap_or_default()
            .into_iter()
            .map(|c| Choice::new(c.id, c.name))
            .collect()
    }

    fn brand_choices(&self) -> Vec<Choice> {
        self.brands
            .state()
            .entities
            .unwrap_or_default()
            .into_iter()
            .map(|b| Choice::new(b.id, b.name))
            .collect()
    }

    fn with_pickers(&self, form: RecordForm) -> RecordForm {
        if form.kind != RecordKind::Product {
            return form;
        }
        form.with_choices("Category", self.category_choices())
            .with_choices("Brand", self.brand_choices())
    }

    pub fn new_record(&mut self) {
        if let Screen::Records(kind) = self.screen {
            self.reset_record_errors(kind);
            self.input_mode = InputMode::Form(self.with_pickers(RecordForm::new(kind)));
        }
    }

    /// Open the edit form for the selected row
    pub fn edit_record(&mut self) {
        let Screen::Records(kind) = self.screen else {
            return;
        };
        let cursor = self.cursor;
        let form = match kind {
            RecordKind::Product => self
                .products
                .state()
                .entities
                .and_then(|e| e.get(cursor).map(RecordForm::edit_product)),
            RecordKind::Category => self
                .categories
                .state()
                .entities
                .and_then(|e| e.get(cursor).map(RecordForm::edit_category)),
            RecordKind::Brand => self
                .brands
                .state()
                .entities
                .and_then(|e| e.get(cursor).map(RecordForm::edit_brand)),
        };

        if let Some(form) = form {
            self.reset_record_errors(kind);
            self.detail = None;
            self.input_mode = InputMode::Form(self.with_pickers(form));
        }
    }

    pub fn cancel_form(&mut self) {
        self.input_mode = InputMode::Normal;
        self.clear_status();
    }

    pub fn submit_form(&mut self) {
        let InputMode::Form(form) = &self.input_mode else {
            return;
        };
        let form = form.clone();
        match self.save_request(&form) {
            Ok(()) => self.set_status("Saving...", StatusLevel::Info),
            Err(e) => self.set_status(e.to_string(), StatusLevel::Error),
        }
    }

    fn save_request(&self, form: &RecordForm) -> Result<(), FormError> {
        let kind = form.kind;
        let edit = form.is_edit();

        match kind {
            RecordKind::Product => {
                let payload = form.product_payload()?;
                let m = Arc::clone(&self.products);
                self.spawn(
                    async move {
                        if edit {
                            m.update(&payload).await
                        } else {
                            m.create(&payload).await
                        }
                    },
                    Settled::Saved(kind),
                );
            }
            RecordKind::Category => {
                let payload = form.category_payload()?;
                let m = Arc::clone(&self.categories);
                self.spawn(
                    async move {
                        if edit {
                            m.update(&payload).await
                        } else {
                            m.create(&payload).await
                        }
                    },
                    Settled::Saved(kind),
                );
            }
            RecordKind::Brand => {
                let payload = form.brand_payload()?;
                let m = Arc::clone(&self.brands);
                self.spawn(
                    async move {
                        if edit {
                            m.update(&payload).await
                        } else {
                            m.create(&payload).await
                        }
                    },
                    Settled::Saved(kind),
                );
            }
        }
        Ok(())
    }

    /// Delete the selected row, asking first unless disabled in config
    pub fn request_delete(&mut self) {
        let Screen::Records(kind) = self.screen else {
            return;
        };
        let Some((id, name)) = self.selected(kind) else {
            return;
        };

        if self.config.client.confirm_delete {
            self.input_mode = InputMode::Confirm { kind, id, name };
        } else {
            self.delete(kind, id);
        }
    }

    pub fn confirm_delete(&mut self) {
        if let InputMode::Confirm { kind, id, .. } = &self.input_mode {
            let (kind, id) = (*kind, id.clone());
            self.input_mode = InputMode::Normal;
            self.delete(kind, id);
        }
    }

    pub fn cancel_confirm(&mut self) {
        self.input_mode = InputMode::Normal;
    }

    fn delete(&self, kind: RecordKind, id: String) {
        match kind {
            RecordKind::Product => {
                let m = Arc::clone(&self.products);
                self.spawn(async move { m.delete(&id).await }, Settled::Deleted(kind));
            }
            RecordKind::Category => {
                let m = Arc::clone(&self.categories);
                self.spawn(async move { m.delete(&id).await }, Settled::Deleted(kind));
            }
            RecordKind::Brand => {
                let m = Arc::clone(&self.brands);
                self.spawn(async move { m.delete(&id).await }, Settled::Deleted(kind));
            }
        }
    }

    fn reset_record_errors(&self, kind: RecordKind) {
        match kind {
            RecordKind::Product => self.products.reset_errors(),
            RecordKind::Category => self.categories.reset_errors(),
            RecordKind::Brand => self.brands.reset_errors(),
        }
    }
}

/// Readable error of a request state, if any
pub fn error_message<T>(state: &RequestState<T>) -> Option<String> {
    state
        .error
        .as_deref()
        .map(|code| describe_error(code, state.error_objects.as_deref()))
}

/// Panel contents once a detail call for `id` has settled.
///
/// A record left over from an earlier call never counts as found.
fn detail_view<T: Identified + Clone>(
    state: &RequestState<T>,
    id: &str,
    wrap: fn(T) -> DetailRecord,
) -> DetailView {
    match (&state.error, &state.entity) {
        (Some(code), _) if code == NOT_FOUND => DetailView::NotFound,
        (Some(_), _) => DetailView::Failed(error_message(state).unwrap_or_default()),
        (None, Some(entity)) if entity.record_id() == id => DetailView::Found(wrap(entity.clone())),
        (None, _) => DetailView::NotFound,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use bsa_core::models::{Session, User};
    use bsa_core::{
        ApiRequest, ApiResponse, MemorySessionStore, Method, SessionStore, TokenRenewal,
        Transport,
    };
    use serde_json::{json, Value};

    /// Answers each request with the first unused reply scripted for its
    /// method and path, and records every request
    #[derive(Default)]
    struct FakeApi {
        replies: Mutex<Vec<(Method, String, u16, Value)>>,
        requests: Mutex<Vec<ApiRequest>>,
    }

    impl FakeApi {
        fn on(&self, method: Method, path: &str, status: u16, body: Value) {
            self.replies
                .lock()
                .unwrap()
                .push((method, path.to_string(), status, body));
        }

        fn requests_to(&self, method: Method, path: &str) -> Vec<ApiRequest> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.method == method && r.path == path)
                .cloned()
                .collect()
        }
    }

    #[async_trait]
    impl Transport for FakeApi {
        async fn execute(&self, request: ApiRequest) -> ApiResponse {
            self.requests.lock().unwrap().push(request.clone());
            let reply = {
                let mut replies = self.replies.lock().unwrap();
                replies
                    .iter()
                    .position(|(m, p, _, _)| *m == request.method && *p == request.path)
                    .map(|i| replies.remove(i))
            };
            match reply {
                Some((_, _, status, body)) => ApiResponse::from_status(request, status, Some(body)),
                None => ApiResponse::from_status(request, 500, Some(json!({"error": "unscripted"}))),
            }
        }
    }

    fn stored_session() -> Session {
        Session {
            access_token: "access-1".to_string(),
            refresh_token: "refresh-1".to_string(),
            user: Some(User {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
            }),
        }
    }

    fn logged_in_app() -> (App, Arc<FakeApi>, Arc<MemorySessionStore>) {
        let api = Arc::new(FakeApi::default());
        api.on(
            Method::Get,
            "v1/dashboard/stats",
            200,
            json!({"stats": {"productsTotal": 0, "categoriesTotal": 0, "brandsTotal": 0}}),
        );
        let store = Arc::new(MemorySessionStore::with_session(stored_session()));
        let client = ApiClient::new(api.clone(), store.clone())
            .with_interceptor(Arc::new(TokenRenewal::new(store.clone())));
        (App::new(Config::default(), client), api, store)
    }

    /// Process settled calls until `wanted` has been handled
    async fn settle_until(app: &mut App, wanted: Settled) {
        loop {
            let settled = tokio::time::timeout(Duration::from_secs(5), app.settled_rx.recv())
                .await
                .expect("call did not settle")
                .expect("channel closed");
            let done = settled == wanted;
            app.handle_settled(settled);
            if done {
                return;
            }
        }
    }

    fn categories(ids: &[&str]) -> Value {
        let list: Vec<Value> = ids
            .iter()
            .map(|id| json!({"_id": id, "name": format!("Category {}", id)}))
            .collect();
        json!({"categories": list})
    }

    fn product_page(id: &str, page: u64) -> Value {
        json!({
            "products": [{"_id": id, "name": "Hammer", "price": 9.5, "quantity": 3}],
            "total": 7,
            "limit": 5,
            "currentPage": page
        })
    }

    fn type_into_form(app: &mut App, text: &str) {
        let InputMode::Form(record) = &mut app.input_mode else {
            panic!("form not open");
        };
        for c in text.chars() {
            record.form.push(c);
        }
    }

    #[tokio::test]
    async fn test_detail_of_missing_record_is_not_found() {
        let (mut app, api, _) = logged_in_app();
        api.on(Method::Get, "v1/category", 200, categories(&["c1", "c2"]));
        api.on(
            Method::Get,
            "v1/category/c1",
            200,
            json!({"category": {"_id": "c1", "name": "Tools"}}),
        );
        api.on(Method::Get, "v1/category/c2", 404, json!({"error": "not_found"}));

        app.show(Screen::Records(RecordKind::Category));
        settle_until(&mut app, Settled::Listed(RecordKind::Category)).await;

        app.open_detail();
        settle_until(&mut app, Settled::Detail(RecordKind::Category, "c1".into())).await;
        let detail = app.detail.clone().unwrap();
        assert!(matches!(
            detail.view,
            DetailView::Found(DetailRecord::Category(ref c)) if c.name == "Tools"
        ));

        app.close_detail();
        app.cursor_down();
        app.open_detail();
        assert_eq!(app.detail.as_ref().unwrap().view, DetailView::Loading);

        settle_until(&mut app, Settled::Detail(RecordKind::Category, "c2".into())).await;
        let detail = app.detail.clone().unwrap();
        assert_eq!(detail.id, "c2");
        assert_eq!(detail.view, DetailView::NotFound);
    }

    #[tokio::test]
    async fn test_detail_failure_shows_error_not_not_found() {
        let (mut app, api, _) = logged_in_app();
        api.on(Method::Get, "v1/brand", 200, json!({"brands": [{"_id": "b1", "name": "Acme"}]}));
        api.on(Method::Get, "v1/brand/b1", 503, json!({"error": "maintenance"}));

        app.show(Screen::Records(RecordKind::Brand));
        settle_until(&mut app, Settled::Listed(RecordKind::Brand)).await;
        app.open_detail();
        settle_until(&mut app, Settled::Detail(RecordKind::Brand, "b1".into())).await;

        assert_eq!(
            app.detail.unwrap().view,
            DetailView::Failed("maintenance".to_string())
        );
        assert_eq!(
            app.status_message,
            Some(("maintenance".to_string(), StatusLevel::Error))
        );
    }

    #[tokio::test]
    async fn test_failed_renewal_logs_out() {
        let (mut app, api, store) = logged_in_app();
        api.on(Method::Get, "v1/category", 403, json!({"error": "session_expired"}));
        api.on(Method::Get, "v1/user/renew/refresh-1", 401, json!({"error": "invalid_token"}));

        app.show(Screen::Records(RecordKind::Category));
        settle_until(&mut app, Settled::Listed(RecordKind::Category)).await;

        assert_eq!(app.screen, Screen::Auth);
        assert!(!app.session.is_logged_in());
        assert!(store.load().unwrap().is_none());
        assert_eq!(
            app.status_message,
            Some((describe_error(SESSION_EXPIRED, None), StatusLevel::Error))
        );
    }

    #[tokio::test]
    async fn test_renewal_updates_session_state() {
        let (mut app, api, _) = logged_in_app();
        api.on(Method::Get, "v1/category", 403, json!({"error": "session_expired"}));
        api.on(
            Method::Get,
            "v1/user/renew/refresh-1",
            200,
            json!({"accessToken": "access-2", "refreshToken": "refresh-2"}),
        );
        api.on(Method::Get, "v1/category", 200, categories(&["c1"]));

        app.show(Screen::Records(RecordKind::Category));
        settle_until(&mut app, Settled::Listed(RecordKind::Category)).await;

        assert_eq!(app.screen, Screen::Records(RecordKind::Category));
        assert_eq!(app.row_count(), 1);
        let session = app.session.state();
        assert_eq!(session.access_token, "access-2");
        assert_eq!(session.refresh_token, "refresh-2");
    }

    #[tokio::test]
    async fn test_save_and_delete_reload_the_list() {
        let (mut app, api, _) = logged_in_app();
        api.on(Method::Get, "v1/category", 200, categories(&[]));
        api.on(
            Method::Put,
            "v1/category",
            200,
            json!({"category": {"_id": "c9", "name": "Garden"}}),
        );
        api.on(Method::Get, "v1/category", 200, categories(&["c9"]));
        api.on(Method::Delete, "v1/category/c9", 200, json!({"deletedId": "c9"}));
        api.on(Method::Get, "v1/category", 200, categories(&[]));

        app.show(Screen::Records(RecordKind::Category));
        settle_until(&mut app, Settled::Listed(RecordKind::Category)).await;
        assert_eq!(app.row_count(), 0);

        app.new_record();
        type_into_form(&mut app, "Garden");
        app.submit_form();
        settle_until(&mut app, Settled::Saved(RecordKind::Category)).await;
        assert!(matches!(app.input_mode, InputMode::Normal));
        settle_until(&mut app, Settled::Listed(RecordKind::Category)).await;
        assert_eq!(app.row_count(), 1);

        app.request_delete();
        assert!(matches!(app.input_mode, InputMode::Confirm { ref id, .. } if id == "c9"));
        app.confirm_delete();
        settle_until(&mut app, Settled::Deleted(RecordKind::Category)).await;
        settle_until(&mut app, Settled::Listed(RecordKind::Category)).await;
        assert_eq!(app.row_count(), 0);
        assert_eq!(api.requests_to(Method::Get, "v1/category").len(), 3);
    }

    #[tokio::test]
    async fn test_failed_save_keeps_form_open() {
        let (mut app, api, _) = logged_in_app();
        api.on(Method::Get, "v1/brand", 200, json!({"brands": []}));
        api.on(
            Method::Put,
            "v1/brand",
            400,
            json!({"error": "object_already_exists", "objects": ["name.unique"]}),
        );

        app.show(Screen::Records(RecordKind::Brand));
        settle_until(&mut app, Settled::Listed(RecordKind::Brand)).await;
        app.new_record();
        type_into_form(&mut app, "Acme");
        app.submit_form();
        settle_until(&mut app, Settled::Saved(RecordKind::Brand)).await;

        assert!(matches!(app.input_mode, InputMode::Form(_)));
        assert_eq!(api.requests_to(Method::Get, "v1/brand").len(), 1);
    }

    #[tokio::test]
    async fn test_product_paging_stays_in_bounds() {
        let (mut app, api, _) = logged_in_app();
        api.on(Method::Get, "v1/product", 200, product_page("p1", 1));
        api.on(Method::Get, "v1/product", 200, product_page("p6", 2));
        api.on(Method::Get, "v1/product", 200, product_page("p1", 1));
        api.on(Method::Get, "v1/category", 200, categories(&["c1"]));
        api.on(Method::Get, "v1/brand", 200, json!({"brands": []}));

        app.show(Screen::Records(RecordKind::Product));
        settle_until(&mut app, Settled::Listed(RecordKind::Product)).await;

        app.prev_page();
        assert_eq!(app.page, 1);

        app.next_page();
        assert_eq!(app.page, 2);
        settle_until(&mut app, Settled::Listed(RecordKind::Product)).await;

        // Page 2 of 2 is the last
        app.next_page();
        assert_eq!(app.page, 2);

        app.prev_page();
        assert_eq!(app.page, 1);
        settle_until(&mut app, Settled::Listed(RecordKind::Product)).await;

        let sent = api.requests_to(Method::Get, "v1/product");
        let pages: Vec<String> = sent
            .iter()
            .filter_map(|r| r.query.iter().find(|(k, _)| k == "page").map(|(_, v)| v.clone()))
            .collect();
        assert_eq!(pages, vec!["1", "2", "1"]);
    }

    #[tokio::test]
    async fn test_search_and_category_filter_feed_the_query() {
        let (mut app, api, _) = logged_in_app();
        api.on(Method::Get, "v1/category", 200, categories(&["c1", "c2"]));
        api.on(Method::Get, "v1/brand", 200, json!({"brands": []}));
        for _ in 0..6 {
            api.on(Method::Get, "v1/product", 200, product_page("p1", 1));
        }

        app.show(Screen::Records(RecordKind::Product));
        settle_until(&mut app, Settled::Listed(RecordKind::Category)).await;

        app.page = 2;
        app.start_search();
        if let InputMode::Search(text) = &mut app.input_mode {
            text.push_str(" ham ");
        }
        app.apply_search();
        assert_eq!(app.page, 1);

        app.cycle_category_filter();
        assert_eq!(app.category_filter.as_deref(), Some("c1"));
        assert_eq!(app.category_filter_label().as_deref(), Some("Category c1"));

        let query = app.product_query();
        assert_eq!(query.get("name"), Some("ham"));
        assert_eq!(query.get("category"), Some("c1"));
        assert_eq!(query.get("page"), Some("1"));
        assert_eq!(query.get("limit"), Some("5"));

        app.cycle_category_filter();
        assert_eq!(app.category_filter.as_deref(), Some("c2"));
        app.cycle_category_filter();
        assert_eq!(app.category_filter, None);

        app.clear_filters();
        assert!(app.product_query().get("name").is_none());
    }

    #[tokio::test]
    async fn test_product_form_picks_from_loaded_lists() {
        let (mut app, api, _) = logged_in_app();
        api.on(Method::Get, "v1/product", 200, product_page("p1", 1));
        api.on(Method::Get, "v1/category", 200, categories(&["c1"]));
        api.on(Method::Get, "v1/brand", 200, json!({"brands": [{"_id": "b1", "name": "Acme"}]}));

        app.show(Screen::Records(RecordKind::Product));
        settle_until(&mut app, Settled::Listed(RecordKind::Category)).await;
        settle_until(&mut app, Settled::Listed(RecordKind::Brand)).await;

        app.new_record();
        let InputMode::Form(record) = &mut app.input_mode else {
            panic!("form not open");
        };
        record.form.focus = 5;
        record.form.cycle(true);
        assert_eq!(record.form.value("Brand"), "b1");
        assert_eq!(record.form.fields[5].display(), "< Acme >");
        assert_eq!(record.form.fields[4].options.len(), 1);
    }
}
