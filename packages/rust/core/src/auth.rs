//! Session state detection.
//!
//! Runs once, on the first landing. Guest signals win over the signed-in
//! marker: an auth wall can render on top of a page that still carries the
//! global nav.

use certscrape_document::DocumentHandle;
use certscrape_shared::{AuthState, Outcome, Result, Stage, TrailEntry};
use tracing::{debug, info};
use url::Url;

/// Auth-wall and guest-header markers.
const GUEST_MARKERS: &[(&str, &str)] = &[
    ("authwall_form", ".authwall-join-form, form.authwall-join-form"),
    ("join_form", "[data-test-id='join-form']"),
    ("guest_header", "[data-test-id='header-join']"),
];

/// Leading path segments of sign-in flows (`/login`, `/signup-…`, `/authwall`).
const GUEST_LOCATION_KEYWORDS: &[&str] = &["login", "signup", "authwall"];

/// Path prefix under which the legacy sign-in flow lives (`/uas/login`).
const LEGACY_AUTH_SEGMENT: &str = "uas";

const SIGNED_IN_NAV: &str = "[data-test-id='nav-bar'], nav.global-nav, #global-nav";

/// Detected state plus one trail entry per signal checked.
#[derive(Debug, Clone)]
pub struct AuthDetection {
    pub state: AuthState,
    pub signals: Vec<TrailEntry>,
}

/// Inspect the current document for guest and signed-in markers.
pub async fn detect(doc: &dyn DocumentHandle) -> Result<AuthDetection> {
    let mut signals = Vec::new();
    let mut guest = false;

    for (name, selector) in GUEST_MARKERS {
        let present = !doc.query(selector).await?.is_empty();
        guest |= present;
        signals.push(signal(name, present));
    }

    let location = doc.current_location().await?;
    let on_sign_in_flow = is_sign_in_flow(&location);
    guest |= on_sign_in_flow;
    signals.push(signal("location_keyword", on_sign_in_flow));

    let state = if guest {
        AuthState::Guest
    } else {
        let signed_in = !doc.query(SIGNED_IN_NAV).await?.is_empty();
        signals.push(signal("global_nav", signed_in));
        if signed_in {
            AuthState::LoggedIn
        } else {
            AuthState::Unknown
        }
    };

    debug!(%location, "auth signals checked");
    info!(%state, "auth state detected");

    Ok(AuthDetection { state, signals })
}

/// Sign-in flows live at the top of the path; profile slugs never count.
fn is_sign_in_flow(location: &Url) -> bool {
    let mut segments = location
        .path_segments()
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty());
    let first = segments.next().unwrap_or_default();
    let lead = if first == LEGACY_AUTH_SEGMENT {
        segments.next().unwrap_or_default()
    } else {
        first
    };
    GUEST_LOCATION_KEYWORDS.iter().any(|k| lead.starts_with(k))
}

fn signal(name: &str, present: bool) -> TrailEntry {
    TrailEntry {
        stage: Stage::Auth,
        strategy: name.to_string(),
        outcome: if present { Outcome::Hit } else { Outcome::Miss },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use certscrape_document::{DocumentSource, StaticSite};

    async fn detect_on(url: &str, html: &str) -> AuthDetection {
        let url = Url::parse(url).unwrap();
        let site = StaticSite::new().with_page(&url, html);
        let mut doc = site.open().await.unwrap();
        doc.navigate(&url).await.unwrap();
        detect(doc.as_ref()).await.unwrap()
    }

    #[tokio::test]
    async fn global_nav_means_logged_in() {
        let found = detect_on(
            "https://www.example.com/in/jane-doe/",
            r#"<html><body><nav id="global-nav" class="global-nav"></nav></body></html>"#,
        )
        .await;
        assert_eq!(found.state, AuthState::LoggedIn);
        assert!(found.signals.iter().any(|e| e.strategy == "global_nav" && e.outcome == Outcome::Hit));
    }

    #[tokio::test]
    async fn join_form_means_guest_even_with_nav() {
        let found = detect_on(
            "https://www.example.com/in/jane-doe/",
            r#"<html><body><nav class="global-nav"></nav>
                <form class="authwall-join-form"><input name="email"></form></body></html>"#,
        )
        .await;
        assert_eq!(found.state, AuthState::Guest);
    }

    #[tokio::test]
    async fn sign_in_location_means_guest() {
        let found = detect_on(
            "https://www.example.com/authwall/",
            "<html><body><p>Sign in to continue</p></body></html>",
        )
        .await;
        assert_eq!(found.state, AuthState::Guest);
        assert!(found.signals.iter().any(|e| e.strategy == "location_keyword" && e.outcome == Outcome::Hit));
    }

    #[tokio::test]
    async fn profile_slug_containing_keyword_is_not_a_sign_in_flow() {
        let found = detect_on(
            "https://www.example.com/in/anna-loginova/",
            r#"<html><body><nav id="global-nav" class="global-nav"></nav></body></html>"#,
        )
        .await;
        assert_eq!(found.state, AuthState::LoggedIn);
        assert!(found.signals.iter().any(|e| e.strategy == "location_keyword" && e.outcome == Outcome::Miss));
    }

    #[test]
    fn sign_in_paths() {
        let flow = |s: &str| is_sign_in_flow(&Url::parse(s).unwrap());
        assert!(flow("https://www.example.com/login"));
        assert!(flow("https://www.example.com/uas/login?session_redirect=x"));
        assert!(flow("https://www.example.com/signup/cold-join"));
        assert!(flow("https://www.example.com/authwall?trk=x"));
        assert!(!flow("https://www.example.com/in/signup-sam/"));
        assert!(!flow("https://www.example.com/in/jane-doe/?from=login"));
    }

    #[tokio::test]
    async fn no_markers_is_unknown() {
        let found = detect_on(
            "https://www.example.com/in/jane-doe/",
            "<html><body><main>plain</main></body></html>",
        )
        .await;
        assert_eq!(found.state, AuthState::Unknown);
        assert_eq!(found.signals.len(), GUEST_MARKERS.len() + 2);
    }
}
