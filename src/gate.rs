use std::sync::Arc;

use crate::error::ConfigError;

/// AccessConfig
///
/// Static routing constants for the access gate. Loaded once at startup (see `AppConfig::load`)
/// and handed to `AccessRouter::new`; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessConfig {
    /// Page that renders the login form. Unauthenticated visitors are sent here.
    pub login_path: String,
    /// Page that renders the signup form.
    pub signup_path: String,
    /// Where an authenticated user lands after login, or when opening an auth page.
    pub landing_path: String,
    /// Path prefixes that skip gating entirely (framework assets, API endpoints).
    pub bypass_prefixes: Vec<String>,
    /// Name of the cookie whose non-empty presence means "has a session".
    pub cookie_name: String,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            login_path: "/login".to_string(),
            signup_path: "/signup".to_string(),
            landing_path: "/admin/agents".to_string(),
            bypass_prefixes: vec![
                "/_next/".to_string(),
                "/assets/".to_string(),
                "/api/".to_string(),
            ],
            cookie_name: "fb-studio-auth-session".to_string(),
        }
    }
}

/// RouteClass
///
/// The three categories every request path falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Assets, API endpoints and anything that looks like a file. Never gated.
    Bypass,
    /// Login and signup pages.
    PublicAuthPage,
    /// Everything else, including `/` and every `/admin` page.
    ProtectedArea,
}

/// Verdict
///
/// The gate's instruction to the hosting framework for a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Let the request reach its handler untouched.
    Continue,
    /// Answer with an HTTP redirect to `target`. When `redirect` is set, it is the originally
    /// requested path (plus query) and travels as the `redirect` query parameter.
    RedirectTo {
        target: String,
        redirect: Option<String>,
    },
}

impl Verdict {
    /// location
    ///
    /// Renders the `Location` header value for a redirect verdict. The `redirect`
    /// parameter is percent-encoded so that the original query survives intact.
    pub fn location(&self) -> Option<String> {
        match self {
            Verdict::Continue => None,
            Verdict::RedirectTo {
                target,
                redirect: None,
            } => Some(target.clone()),
            Verdict::RedirectTo {
                target,
                redirect: Some(original),
            } => Some(format!(
                "{}?redirect={}",
                target,
                urlencoding::encode(original)
            )),
        }
    }
}

/// AccessRouter
///
/// Pure decision function that decides, per request, whether to pass through, send the
/// visitor to the login page, or send an authenticated user to the landing page.
///
/// The router holds no mutable state and performs no I/O: the caller supplies the path,
/// the raw query and whether a session cookie was present. It is shared behind an `Arc`
/// and invoked concurrently from every request task.
#[derive(Debug, Clone)]
pub struct AccessRouter {
    config: AccessConfig,
}

/// AccessState
///
/// The shared handle stored in the application state.
pub type AccessState = Arc<AccessRouter>;

impl AccessRouter {
    /// new
    ///
    /// Validates the configuration and builds the router.
    ///
    /// # Errors
    /// Returns a `ConfigError` when a path is not absolute, when the landing page is itself
    /// an auth page (that would bounce forever), or when one of the gate's own targets is
    /// swallowed by a bypass rule.
    pub fn new(config: AccessConfig) -> Result<Self, ConfigError> {
        let router = Self { config };
        router.validate()?;
        Ok(router)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let cfg = &self.config;

        if cfg.cookie_name.trim().is_empty() {
            return Err(ConfigError::EmptyCookieName);
        }

        for path in [&cfg.login_path, &cfg.signup_path, &cfg.landing_path] {
            if !path.starts_with('/') {
                return Err(ConfigError::NotAbsolute(path.clone()));
            }
        }
        for prefix in &cfg.bypass_prefixes {
            if !prefix.starts_with('/') {
                return Err(ConfigError::NotAbsolute(prefix.clone()));
            }
        }

        if cfg.login_path == cfg.signup_path {
            return Err(ConfigError::SharedAuthPath(cfg.login_path.clone()));
        }

        if cfg.landing_path == cfg.login_path || cfg.landing_path == cfg.signup_path {
            return Err(ConfigError::LandingIsAuthPage(cfg.landing_path.clone()));
        }

        for path in [&cfg.login_path, &cfg.signup_path, &cfg.landing_path] {
            if self.is_bypassed(path) {
                return Err(ConfigError::Bypassed(path.clone()));
            }
        }

        Ok(())
    }

    pub fn cookie_name(&self) -> &str {
        &self.config.cookie_name
    }

    pub fn login_path(&self) -> &str {
        &self.config.login_path
    }

    pub fn signup_path(&self) -> &str {
        &self.config.signup_path
    }

    pub fn landing_path(&self) -> &str {
        &self.config.landing_path
    }

    fn is_bypassed(&self, path: &str) -> bool {
        if self
            .config
            .bypass_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
        {
            return true;
        }

        // A dot in the last segment is treated as a file extension.
        path.rsplit('/')
            .next()
            .is_some_and(|segment| segment.contains('.'))
    }

    fn is_auth_page(&self, path: &str) -> bool {
        path == self.config.login_path || path == self.config.signup_path
    }

    /// classify
    ///
    /// Maps a path onto its `RouteClass`. Rules are checked top to bottom.
    pub fn classify(&self, path: &str) -> RouteClass {
        if self.is_bypassed(path) {
            RouteClass::Bypass
        } else if self.is_auth_page(path) {
            RouteClass::PublicAuthPage
        } else {
            RouteClass::ProtectedArea
        }
    }

    /// decide
    ///
    /// The 2x3 decision table (session present/absent against the three route classes).
    ///
    /// * `path`: request path, starting with `/`.
    /// * `query`: raw query string without the leading `?`; may be empty.
    /// * `has_session`: whether a non-empty session cookie was sent.
    pub fn decide(&self, path: &str, query: &str, has_session: bool) -> Verdict {
        match (self.classify(path), has_session) {
            (RouteClass::Bypass, _) => Verdict::Continue,

            (RouteClass::PublicAuthPage, true) => Verdict::RedirectTo {
                target: self.config.landing_path.clone(),
                redirect: None,
            },
            (RouteClass::PublicAuthPage, false) => Verdict::Continue,

            (RouteClass::ProtectedArea, true) => Verdict::Continue,
            (RouteClass::ProtectedArea, false) => self.send_to_login(path, query),
        }
    }

    fn send_to_login(&self, path: &str, query: &str) -> Verdict {
        // Unreachable while auth pages are classified first; kept so that reordering
        // the rules in `decide` can never point the login page at itself with a parameter.
        if path == self.config.login_path {
            return Verdict::RedirectTo {
                target: self.config.login_path.clone(),
                redirect: None,
            };
        }

        let original = if query.is_empty() {
            path.to_string()
        } else {
            format!("{}?{}", path, query)
        };

        Verdict::RedirectTo {
            target: self.config.login_path.clone(),
            redirect: Some(original),
        }
    }

    /// post_login_target
    ///
    /// Resolves where the client should navigate after a successful login. The `redirect`
    /// value round-trips through the browser, so only local, gated paths are honoured;
    /// anything else falls back to the landing page.
    pub fn post_login_target(&self, requested: Option<&str>) -> String {
        match requested {
            Some(target)
                if target.starts_with('/')
                    && !target.starts_with("//")
                    && !target.contains('\\')
                    && !self.is_auth_page(path_of(target)) =>
            {
                target.to_string()
            }
            _ => self.config.landing_path.clone(),
        }
    }
}

fn path_of(target: &str) -> &str {
    target.split(['?', '#']).next().unwrap_or(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> AccessRouter {
        AccessRouter::new(AccessConfig::default()).unwrap()
    }

    fn redirect(target: &str, original: Option<&str>) -> Verdict {
        Verdict::RedirectTo {
            target: target.to_string(),
            redirect: original.map(str::to_string),
        }
    }

    #[test]
    fn protected_page_without_session_goes_to_login() {
        assert_eq!(
            router().decide("/admin/dashboard", "", false),
            redirect("/login", Some("/admin/dashboard"))
        );
    }

    #[test]
    fn login_with_session_goes_to_landing() {
        assert_eq!(
            router().decide("/login", "", true),
            redirect("/admin/agents", None)
        );
        assert_eq!(
            router().decide("/signup", "", true),
            redirect("/admin/agents", None)
        );
    }

    #[test]
    fn auth_pages_without_session_continue() {
        assert_eq!(router().decide("/login", "", false), Verdict::Continue);
        assert_eq!(router().decide("/signup", "next=1", false), Verdict::Continue);
    }

    #[test]
    fn bypass_paths_ignore_session() {
        let r = router();
        for path in [
            "/styles.css",
            "/favicon.ico",
            "/img/logo.png",
            "/api/anything",
            "/api/auth/login",
            "/_next/static/chunk",
            "/assets/app",
        ] {
            assert_eq!(r.classify(path), RouteClass::Bypass, "{path}");
            assert_eq!(r.decide(path, "", false), Verdict::Continue, "{path}");
            assert_eq!(r.decide(path, "", true), Verdict::Continue, "{path}");
        }
    }

    #[test]
    fn dot_only_counts_in_last_segment() {
        let r = router();
        assert_eq!(r.classify("/v1.2/admin"), RouteClass::ProtectedArea);
        assert_eq!(r.classify("/admin/report.pdf"), RouteClass::Bypass);
    }

    #[test]
    fn root_is_protected() {
        let r = router();
        assert_eq!(r.classify("/"), RouteClass::ProtectedArea);
        assert_eq!(r.decide("/", "", false), redirect("/login", Some("/")));
        assert_eq!(r.decide("/", "", true), Verdict::Continue);
    }

    #[test]
    fn query_is_carried_into_redirect() {
        let verdict = router().decide("/admin/tools", "page=2&sort=name", false);
        assert_eq!(
            verdict,
            redirect("/login", Some("/admin/tools?page=2&sort=name"))
        );
        assert_eq!(
            verdict.location().unwrap(),
            "/login?redirect=%2Fadmin%2Ftools%3Fpage%3D2%26sort%3Dname"
        );
    }

    #[test]
    fn login_safety_net_drops_redirect_param() {
        let r = router();
        assert_eq!(r.send_to_login("/login", "redirect=%2F"), redirect("/login", None));
        assert_eq!(
            r.send_to_login("/admin", ""),
            redirect("/login", Some("/admin"))
        );
    }

    #[test]
    fn redirects_settle_after_one_hop() {
        let r = router();
        let paths = [
            "/",
            "/login",
            "/signup",
            "/admin",
            "/admin/agents",
            "/admin/playground",
            "/anything/else",
            "/api/x",
            "/logo.svg",
        ];
        for has_session in [false, true] {
            for path in paths {
                if let Verdict::RedirectTo { target, .. } = r.decide(path, "a=b", has_session) {
                    assert_eq!(
                        r.decide(&target, "", has_session),
                        Verdict::Continue,
                        "{path} (session: {has_session}) -> {target}"
                    );
                }
            }
        }
    }

    #[test]
    fn decisions_are_deterministic() {
        let r = router();
        let first = r.decide("/admin/dashboard", "x=1", false);
        for _ in 0..10 {
            assert_eq!(r.decide("/admin/dashboard", "x=1", false), first);
        }
    }

    #[test]
    fn custom_login_path_is_respected() {
        let r = AccessRouter::new(AccessConfig {
            login_path: "/auth/sign-in".to_string(),
            ..AccessConfig::default()
        })
        .unwrap();
        assert_eq!(r.decide("/login", "", false), redirect("/auth/sign-in", Some("/login")));
        assert_eq!(r.decide("/auth/sign-in", "", false), Verdict::Continue);
    }

    #[test]
    fn rejects_looping_configurations() {
        let landing_on_login = AccessConfig {
            landing_path: "/login".to_string(),
            ..AccessConfig::default()
        };
        assert_eq!(
            AccessRouter::new(landing_on_login).unwrap_err(),
            ConfigError::LandingIsAuthPage("/login".to_string())
        );

        let login_bypassed = AccessConfig {
            login_path: "/api/login".to_string(),
            ..AccessConfig::default()
        };
        assert_eq!(
            AccessRouter::new(login_bypassed).unwrap_err(),
            ConfigError::Bypassed("/api/login".to_string())
        );

        let relative = AccessConfig {
            signup_path: "signup".to_string(),
            ..AccessConfig::default()
        };
        assert_eq!(
            AccessRouter::new(relative).unwrap_err(),
            ConfigError::NotAbsolute("signup".to_string())
        );

        let shared = AccessConfig {
            signup_path: "/login".to_string(),
            ..AccessConfig::default()
        };
        assert_eq!(
            AccessRouter::new(shared).unwrap_err(),
            ConfigError::SharedAuthPath("/login".to_string())
        );

        let no_cookie = AccessConfig {
            cookie_name: " ".to_string(),
            ..AccessConfig::default()
        };
        assert_eq!(
            AccessRouter::new(no_cookie).unwrap_err(),
            ConfigError::EmptyCookieName
        );
    }

    #[test]
    fn post_login_target_only_accepts_local_paths() {
        let r = router();
        assert_eq!(r.post_login_target(None), "/admin/agents");
        assert_eq!(r.post_login_target(Some("/admin/tools")), "/admin/tools");
        assert_eq!(r.post_login_target(Some("/admin/tools?x=1")), "/admin/tools?x=1");
        assert_eq!(r.post_login_target(Some("https://evil.test")), "/admin/agents");
        assert_eq!(r.post_login_target(Some("//evil.test")), "/admin/agents");
        assert_eq!(r.post_login_target(Some("/\\evil.test")), "/admin/agents");
        assert_eq!(r.post_login_target(Some("/login?redirect=/x")), "/admin/agents");
    }
}
