use crate::domain::entities::UserRecord;
use crate::presentation::views::{
    BrandView, FooterView, LayoutChrome, NavigationLinkView, NavigationView, PageMetaView,
    ViewerView,
};

/// Builds the header, navigation and footer shared by every page.
#[derive(Debug, Clone)]
pub struct ChromeService {
    site_title: String,
    description: String,
}

impl ChromeService {
    pub fn new(site_title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            site_title: site_title.into(),
            description: description.into(),
        }
    }

    pub fn site_title(&self) -> &str {
        &self.site_title
    }

    pub fn load(&self, viewer: Option<&UserRecord>) -> LayoutChrome {
        let mut entries = vec![
            link("Home", "/"),
            link("About the author", "/about/author/"),
            link("Technologies", "/about/tech/"),
        ];
        match viewer {
            Some(_) => entries.extend([
                link("New post", "/create/"),
                link("Following", "/follow/"),
                link("Log out", "/auth/logout/"),
            ]),
            None => entries.extend([link("Log in", "/auth/login/"), link("Sign up", "/auth/signup/")]),
        }

        LayoutChrome {
            brand: BrandView {
                title: self.site_title.clone(),
                href: "/".to_string(),
            },
            navigation: NavigationView { entries },
            footer: FooterView {
                copy: format!("© {}", self.site_title),
            },
            viewer: ViewerView {
                username: viewer.map(|user| user.username.clone()),
            },
            meta: PageMetaView {
                title: self.site_title.clone(),
                description: self.description.clone(),
            },
        }
    }
}

fn link(label: &str, href: &str) -> NavigationLinkView {
    NavigationLinkView {
        label: label.to_string(),
        href: href.to_string(),
    }
}
