//! In-memory scripted site implementing the page traits.

use std::collections::HashSet;
use std::sync::{Arc, Barrier, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ScraperError;
use crate::page::{AutomationHandle, Launcher, MarkerStrategy, Page, Role};

pub(crate) const SEARCH_URL: &str = "https://2gis.ru/almaty/search/%D0%BA%D0%B0%D1%84%D0%B5";

#[derive(Debug, Clone)]
pub(crate) struct FakeReview {
    pub name: String,
    /// `None` makes the glyph count fail.
    pub glyphs: Option<usize>,
    pub filled: usize,
    pub has_stars: bool,
    pub text: Option<String>,
    pub full_text: Option<String>,
    pub likes: Option<String>,
}

impl FakeReview {
    pub fn new(name: &str, stars: usize) -> Self {
        Self {
            name: name.to_string(),
            glyphs: Some(stars),
            filled: 0,
            has_stars: true,
            text: Some(format!("Review by {name}")),
            full_text: None,
            likes: Some("1".to_string()),
        }
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn no_text(mut self) -> Self {
        self.text = None;
        self
    }

    pub fn expandable(mut self, full: &str) -> Self {
        self.full_text = Some(full.to_string());
        self
    }

    pub fn filled_only(mut self, filled: usize) -> Self {
        self.glyphs = Some(0);
        self.filled = filled;
        self
    }

    pub fn broken_stars(mut self) -> Self {
        self.glyphs = None;
        self
    }

    pub fn no_stars(mut self) -> Self {
        self.has_stars = false;
        self
    }

    pub fn likes(mut self, likes: Option<&str>) -> Self {
        self.likes = likes.map(str::to_string);
        self
    }
}

#[derive(Debug, Clone)]
pub(crate) struct FakeListing {
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub url: String,
    pub reviews_tab: bool,
    pub overall: Option<String>,
    pub total_text: Option<String>,
    pub reviews: Vec<FakeReview>,
    pub title_error: bool,
}

impl FakeListing {
    pub fn new(name: &str, id: u32) -> Self {
        Self {
            name: name.to_string(),
            phone: Some(format!("+7 701 000 {id:04}")),
            address: Some(format!("Абая, {id}")),
            url: format!("https://2gis.ru/almaty/firm/{id}"),
            reviews_tab: true,
            overall: Some("4.5".to_string()),
            total_text: None,
            reviews: Vec::new(),
            title_error: false,
        }
    }

    pub fn with_reviews(mut self, reviews: Vec<FakeReview>) -> Self {
        self.total_text = Some(format!("{} оценок", reviews.len()));
        self.reviews = reviews;
        self
    }

    pub fn reported(mut self, total_text: &str) -> Self {
        self.total_text = Some(total_text.to_string());
        self
    }
}

/// How the page offers further reviews.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoadMoreStyle {
    Button,
    /// Button exists but refuses clicks; a text-matched control works.
    RefusesClick,
    TextOnly,
    /// Locating the button errors; scrolling to the bottom loads more.
    Broken,
    Absent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Blank,
    Results(usize),
    Listing(usize),
    Reviews(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FakeEl {
    role: Role,
    review: Option<usize>,
    via_text: bool,
}

impl FakeEl {
    fn new(role: Role) -> Self {
        Self {
            role,
            review: None,
            via_text: false,
        }
    }
}

type Hook = Box<dyn FnMut() + Send>;

struct FakeState {
    listings: Vec<FakeListing>,
    result_pages: Vec<Vec<Option<usize>>>,
    batch: usize,
    load_more: LoadMoreStyle,
    cookie_banner: bool,
    fail_navigation: bool,
    screen: Screen,
    history: Vec<Screen>,
    rendered: usize,
    phone_revealed: bool,
    expanded: HashSet<usize>,
    calls: Vec<String>,
    hooks: Vec<(Role, Hook)>,
}

/// Cloning shares the underlying site, so a test can keep a copy for
/// inspection after handing one to the code under test.
#[derive(Clone)]
pub(crate) struct FakePage {
    state: Arc<Mutex<FakeState>>,
}

impl FakePage {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState {
                listings: Vec::new(),
                result_pages: Vec::new(),
                batch: usize::MAX,
                load_more: LoadMoreStyle::Absent,
                cookie_banner: false,
                fail_navigation: false,
                screen: Screen::Blank,
                history: Vec::new(),
                rendered: 0,
                phone_revealed: false,
                expanded: HashSet::new(),
                calls: Vec::new(),
                hooks: Vec::new(),
            })),
        }
    }

    /// A page already showing `listing`'s card.
    pub fn on_listing(listing: FakeListing) -> Self {
        let page = Self::new();
        {
            let mut s = page.lock();
            s.listings.push(listing);
            s.screen = Screen::Listing(0);
        }
        page
    }

    /// A site whose search results list `pages` of listings.
    pub fn search_site(pages: Vec<Vec<FakeListing>>) -> Self {
        let page = Self::new();
        {
            let mut s = page.lock();
            for listings in pages {
                let mut slots = Vec::new();
                for listing in listings {
                    slots.push(Some(s.listings.len()));
                    s.listings.push(listing);
                }
                s.result_pages.push(slots);
            }
        }
        page
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake page lock")
    }

    pub fn batch(self, batch: usize) -> Self {
        self.lock().batch = batch;
        self
    }

    pub fn load_more(self, style: LoadMoreStyle) -> Self {
        self.lock().load_more = style;
        self
    }

    pub fn cookie_banner(self) -> Self {
        self.lock().cookie_banner = true;
        self
    }

    pub fn failing_navigation(self) -> Self {
        self.lock().fail_navigation = true;
        self
    }

    /// Insert an empty slot before result `ordinal` on the first page.
    pub fn gap_at(self, ordinal: usize) -> Self {
        self.lock().result_pages[0].insert(ordinal - 1, None);
        self
    }

    /// Run `hook` every time `role` is looked up.
    pub fn on_find(self, role: Role, hook: impl FnMut() + Send + 'static) -> Self {
        self.lock().hooks.push((role, Box::new(hook)));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn count_calls(&self, call: &str) -> usize {
        self.lock().calls.iter().filter(|c| *c == call).count()
    }

    fn listing(&self, s: &FakeState) -> Option<usize> {
        match s.screen {
            Screen::Listing(i) | Screen::Reviews(i) => Some(i),
            Screen::Blank | Screen::Results(_) => None,
        }
    }
}

impl FakeState {
    fn review(&self, idx: usize, ordinal: usize) -> Option<&FakeReview> {
        if ordinal == 0 || ordinal > self.rendered {
            return None;
        }
        self.listings[idx].reviews.get(ordinal - 1)
    }

    fn more_reviews(&self, idx: usize) -> bool {
        self.rendered < self.listings[idx].reviews.len()
    }

    fn reveal(&mut self, idx: usize) {
        let total = self.listings[idx].reviews.len();
        self.rendered = self.rendered.saturating_add(self.batch).min(total);
    }

    fn present(&self, role: Role) -> bool {
        if role == Role::CookieBanner {
            return self.cookie_banner;
        }
        match self.screen {
            Screen::Blank => false,
            Screen::Results(p) => match role {
                Role::ResultItem(n) => self.result_pages[p]
                    .get(n.wrapping_sub(1))
                    .is_some_and(Option::is_some),
                Role::NextPage => p + 1 < self.result_pages.len(),
                _ => false,
            },
            Screen::Listing(i) => {
                let l = &self.listings[i];
                match role {
                    Role::Title => !l.name.is_empty(),
                    Role::PhoneReveal => l.phone.is_some() && !self.phone_revealed,
                    Role::Phone => l.phone.is_some() && self.phone_revealed,
                    Role::Address => l.address.is_some(),
                    Role::ReviewsEntry => l.reviews_tab,
                    _ => false,
                }
            }
            Screen::Reviews(i) => {
                let l = &self.listings[i];
                match role {
                    Role::OverallRating => l.overall.is_some(),
                    Role::TotalRatingCount => l.total_text.is_some(),
                    Role::ReviewerName(n) => self.review(i, n).is_some(),
                    Role::StarContainer(n) => self.review(i, n).is_some_and(|r| r.has_stars),
                    Role::ReviewText(n) => self.review(i, n).is_some_and(|r| r.text.is_some()),
                    Role::ReviewLikes(n) => self.review(i, n).is_some_and(|r| r.likes.is_some()),
                    Role::LoadMore => {
                        matches!(
                            self.load_more,
                            LoadMoreStyle::Button | LoadMoreStyle::RefusesClick
                        ) && self.more_reviews(i)
                    }
                    _ => false,
                }
            }
        }
    }
}

#[async_trait]
impl Page for FakePage {
    type Element = FakeEl;

    async fn find_one(&self, role: Role) -> Result<Option<FakeEl>, ScraperError> {
        let mut s = self.lock();
        for (hook_role, hook) in &mut s.hooks {
            if *hook_role == role {
                hook();
            }
        }
        if role == Role::LoadMore
            && s.load_more == LoadMoreStyle::Broken
            && matches!(s.screen, Screen::Reviews(_))
        {
            return Err(ScraperError::Script("load-more lookup crashed".to_string()));
        }
        Ok(s.present(role).then(|| FakeEl::new(role)))
    }

    async fn wait_clickable(
        &self,
        role: Role,
        _timeout: Duration,
    ) -> Result<Option<FakeEl>, ScraperError> {
        self.lock().calls.push(format!("wait {role}"));
        self.find_one(role).await
    }

    async fn click(&self, element: &FakeEl) -> Result<(), ScraperError> {
        let mut s = self.lock();
        s.calls.push(format!("click {}", element.role));
        match element.role {
            Role::CookieBanner => s.cookie_banner = false,
            Role::ResultItem(n) => {
                let Screen::Results(p) = s.screen else {
                    return Err(ScraperError::Stale);
                };
                let Some(Some(idx)) = s.result_pages[p].get(n - 1).copied() else {
                    return Err(ScraperError::Stale);
                };
                let current = s.screen;
                s.history.push(current);
                s.screen = Screen::Listing(idx);
                s.phone_revealed = false;
            }
            Role::NextPage => {
                if let Screen::Results(p) = s.screen {
                    s.screen = Screen::Results(p + 1);
                }
            }
            Role::PhoneReveal => s.phone_revealed = true,
            Role::ReviewsEntry => {
                let Screen::Listing(i) = s.screen else {
                    return Err(ScraperError::Stale);
                };
                let current = s.screen;
                s.history.push(current);
                s.screen = Screen::Reviews(i);
                s.rendered = 0;
                s.expanded.clear();
                s.reveal(i);
            }
            Role::LoadMore => {
                if s.load_more == LoadMoreStyle::RefusesClick && !element.via_text {
                    return Err(ScraperError::NotInteractable {
                        role: Role::LoadMore,
                    });
                }
                if let Screen::Reviews(i) = s.screen {
                    s.reveal(i);
                }
            }
            Role::ExpandText => {
                if let Some(n) = element.review {
                    s.expanded.insert(n);
                }
            }
            _ => {}
        }
        Ok(())
    }

    async fn read_text(&self, element: &FakeEl) -> Result<String, ScraperError> {
        let s = self.lock();
        let idx = self.listing(&s).ok_or(ScraperError::Stale)?;
        let l = &s.listings[idx];
        let missing = || ScraperError::NotFound { role: element.role };
        let text = match element.role {
            Role::Title if l.title_error => return Err(ScraperError::Stale),
            Role::Title => l.name.clone(),
            Role::Phone => l.phone.clone().ok_or_else(missing)?,
            Role::Address => l.address.clone().ok_or_else(missing)?,
            Role::OverallRating => l.overall.clone().ok_or_else(missing)?,
            Role::TotalRatingCount => l.total_text.clone().ok_or_else(missing)?,
            Role::ReviewerName(n) => s.review(idx, n).ok_or_else(missing)?.name.clone(),
            Role::ReviewText(n) => {
                let r = s.review(idx, n).ok_or_else(missing)?;
                if s.expanded.contains(&n) {
                    r.full_text.clone().ok_or_else(missing)?
                } else {
                    r.text.clone().ok_or_else(missing)?
                }
            }
            Role::ReviewLikes(n) => s
                .review(idx, n)
                .and_then(|r| r.likes.clone())
                .ok_or_else(missing)?,
            _ => return Err(missing()),
        };
        Ok(text)
    }

    async fn count_rating_markers(
        &self,
        container: &FakeEl,
        strategy: MarkerStrategy,
    ) -> Result<usize, ScraperError> {
        let s = self.lock();
        let (Some(idx), Role::StarContainer(n)) = (self.listing(&s), container.role) else {
            return Err(ScraperError::Stale);
        };
        let review = s.review(idx, n).ok_or(ScraperError::Stale)?;
        match strategy {
            MarkerStrategy::Glyphs => review
                .glyphs
                .ok_or_else(|| ScraperError::Script("glyph query failed".to_string())),
            MarkerStrategy::FilledMarkers => Ok(review.filled),
        }
    }

    async fn find_below(
        &self,
        role: Role,
        anchor: &FakeEl,
        _within_px: f64,
    ) -> Result<Option<FakeEl>, ScraperError> {
        let mut s = self.lock();
        s.calls.push(format!("find_below {role} {}", anchor.role));
        let (Some(idx), Role::ExpandText, Role::ReviewText(n)) =
            (self.listing(&s), role, anchor.role)
        else {
            return Ok(None);
        };
        let expandable = s
            .review(idx, n)
            .is_some_and(|r| r.full_text.is_some())
            && !s.expanded.contains(&n);
        Ok(expandable.then(|| FakeEl {
            role: Role::ExpandText,
            review: Some(n),
            via_text: false,
        }))
    }

    async fn find_clickable_by_text(
        &self,
        needles: &[&str],
    ) -> Result<Option<FakeEl>, ScraperError> {
        let mut s = self.lock();
        s.calls.push("find_by_text".to_string());
        let Screen::Reviews(i) = s.screen else {
            return Ok(None);
        };
        let label = "загрузить ещё";
        let offered = matches!(
            s.load_more,
            LoadMoreStyle::TextOnly | LoadMoreStyle::RefusesClick
        ) && s.more_reviews(i);
        Ok((offered && needles.iter().any(|n| label.contains(n))).then(|| FakeEl {
            role: Role::LoadMore,
            review: None,
            via_text: true,
        }))
    }

    async fn scroll_into_view(&self, element: &FakeEl) -> Result<(), ScraperError> {
        self.lock().calls.push(format!("scroll_into_view {}", element.role));
        Ok(())
    }

    async fn scroll_to_bottom(&self) -> Result<(), ScraperError> {
        let mut s = self.lock();
        s.calls.push("scroll_to_bottom".to_string());
        if let (Screen::Reviews(i), LoadMoreStyle::Broken) = (s.screen, s.load_more) {
            s.reveal(i);
        }
        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<(), ScraperError> {
        let mut s = self.lock();
        s.calls.push(format!("navigate {url}"));
        if s.fail_navigation {
            return Err(ScraperError::Navigation {
                url: url.to_string(),
                reason: "net::ERR_INTERNET_DISCONNECTED".to_string(),
            });
        }
        s.history.clear();
        s.phone_revealed = false;
        s.screen = match s.listings.iter().position(|l| l.url == url) {
            Some(i) => Screen::Listing(i),
            None => Screen::Results(0),
        };
        Ok(())
    }

    async fn go_back(&self) -> Result<(), ScraperError> {
        let mut s = self.lock();
        s.calls.push("go_back".to_string());
        s.screen = s.history.pop().unwrap_or(Screen::Blank);
        Ok(())
    }

    async fn current_url(&self) -> Result<String, ScraperError> {
        let s = self.lock();
        Ok(match s.screen {
            Screen::Blank => "about:blank".to_string(),
            Screen::Results(_) => SEARCH_URL.to_string(),
            Screen::Listing(i) => s.listings[i].url.clone(),
            Screen::Reviews(i) => format!("{}/tab/reviews", s.listings[i].url),
        })
    }
}

#[async_trait]
impl AutomationHandle for FakePage {
    async fn housekeeping(&self) -> Result<(), ScraperError> {
        self.lock().calls.push("housekeeping".to_string());
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), ScraperError> {
        self.lock().calls.push("shutdown".to_string());
        Ok(())
    }
}

pub(crate) struct FakeLauncher {
    pub page: FakePage,
    pub fail: bool,
    /// Blocks `launch` until another thread meets it at the barrier.
    pub gate: Option<Arc<Barrier>>,
}

#[async_trait]
impl Launcher for FakeLauncher {
    type Handle = FakePage;

    async fn launch(&self) -> Result<FakePage, ScraperError> {
        if let Some(gate) = &self.gate {
            gate.wait();
        }
        if self.fail {
            return Err(ScraperError::Launch("chrome executable not found".to_string()));
        }
        Ok(self.page.clone())
    }
}
