//! Implements InputPort. Inquire-based terminal console for the portfolio site.
//!
//! The console walks the same routes a browser would: public pages, the login page and
//! the guarded admin area. The admin area is entered through a mounted session guard
//! and left as soon as the guard stops granting access.

use crate::adapters::browser::BrowserLocation;
use crate::domain::{
    ContactMessage, DomainError, GuardDecision, Profile, Project, ProjectDraft, UploadFile,
};
use crate::ports::{AddressBarPort, InputPort, NavigatorPort};
use crate::usecases::{
    ContactService, DashboardData, DashboardView, GalleryService, GalleryView, LoginService,
    MountedGuard, NewImage, Notification, ProfileService, ProjectService, ProjectsView,
    PublicCatalog, SearchBus, SearchInput, SessionGuard,
};
use async_trait::async_trait;
use chrono::Utc;
use inquire::ui::{Color, RenderConfig, Styled};
use inquire::{Confirm, InquireError, Password, Select, Text};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

const ADMIN_PREFIX: &str = "/admin";

/// Route prompt prefix in cyan for every inquire prompt.
pub fn apply_theme() {
    let config = RenderConfig::default()
        .with_prompt_prefix(Styled::new("»").with_fg(Color::LightCyan))
        .with_answered_prompt_prefix(Styled::new("✓").with_fg(Color::LightGreen));
    inquire::set_global_render_config(config);
}

fn ui<T>(r: Result<T, InquireError>) -> Result<T, DomainError> {
    r.map_err(|e| DomainError::Ui(e.to_string()))
}

/// Optional text answer: empty means "none".
fn optional(answer: String) -> Option<String> {
    let trimmed = answer.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Content type from a file name; only image types the site accepts are recognised.
fn content_type_for(name: &str) -> &'static str {
    let ext = name.rsplit('.').next().unwrap_or_default().to_ascii_lowercase();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "avif" => "image/avif",
        _ => "application/octet-stream",
    }
}

/// Path with the search parameter carried over.
fn href_with_query(path: &str, query: &str) -> String {
    if query.is_empty() {
        path.to_string()
    } else {
        format!("{}?q={}", path, urlencoding::encode(query))
    }
}

const ADMIN_NAV: [&str; 7] = [
    "Dashboard", "Projects", "Gallery", "Profile", "Search", "Sign out", "Quit",
];

/// Menu for an admin route: the route's own actions, then navigation.
fn admin_menu(path: &str) -> Vec<&'static str> {
    let actions: &[&'static str] = match path {
        "/admin/projects" => &["New project", "Edit project", "Delete project"],
        "/admin/gallery" => &["Add image", "Delete image"],
        "/admin/profile" => &["Edit profile"],
        _ => &[],
    };
    actions.iter().chain(ADMIN_NAV.iter()).copied().collect()
}

/// Slug of a public project detail route (`/projects/<slug>`).
fn project_slug(path: &str) -> Option<&str> {
    path.strip_prefix("/projects/")
        .filter(|slug| !slug.is_empty() && !slug.contains('/'))
}

fn project_line(p: &Project) -> String {
    let status = if p.published { "published" } else { "draft" };
    format!("{} ({}) [{}]", p.title, p.slug, status)
}

async fn read_upload(path: &str) -> Result<UploadFile, DomainError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| DomainError::Validation(format!("cannot read {}: {}", path, e)))?;
    let name = Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string());
    let content_type = content_type_for(&name);
    Ok(UploadFile::new(name, content_type, bytes))
}

/// Ask for an optional local file to upload.
async fn prompt_upload(message: &str) -> Result<Option<UploadFile>, DomainError> {
    match optional(ui(Text::new(message).with_help_message("empty to skip").prompt())?) {
        Some(path) => Ok(Some(read_upload(&path).await?)),
        None => Ok(None),
    }
}

/// Services the console drives.
pub struct ConsoleServices {
    pub login: LoginService,
    pub projects: ProjectService,
    pub gallery: GalleryService,
    pub profile: ProfileService,
    pub catalog: PublicCatalog,
    pub contact: ContactService,
}

/// TUI adapter. Inquire prompts.
pub struct TuiInputPort {
    location: Arc<BrowserLocation>,
    bus: SearchBus,
    guard: SessionGuard,
    services: ConsoleServices,
}

enum Flow {
    Continue,
    Quit,
}

impl TuiInputPort {
    pub fn new(
        location: Arc<BrowserLocation>,
        bus: SearchBus,
        guard: SessionGuard,
        services: ConsoleServices,
    ) -> Self {
        Self {
            location,
            bus,
            guard,
            services,
        }
    }

    fn address_bar(&self) -> Arc<dyn AddressBarPort> {
        Arc::clone(&self.location) as Arc<dyn AddressBarPort>
    }

    async fn public_page(&self) -> Result<Flow, DomainError> {
        let choice = ui(Select::new(
            "Portfolio",
            vec!["Projects", "Gallery", "Contact", "Admin", "Quit"],
        )
        .prompt())?;
        match choice {
            "Projects" => {
                let projects = self.services.catalog.projects().await?;
                if projects.is_empty() {
                    println!("No projects published yet.");
                    return Ok(Flow::Continue);
                }
                for p in &projects {
                    println!("- {} /projects/{}", p.title, p.slug);
                    if !p.tags.is_empty() {
                        println!("    {}", p.tags.join(", "));
                    }
                }
                let mut labels: Vec<String> = projects.iter().map(|p| p.title.clone()).collect();
                labels.push("Back".to_string());
                let picked = ui(Select::new("Open project:", labels.clone()).prompt())?;
                if let Some(p) = labels
                    .iter()
                    .position(|l| *l == picked)
                    .and_then(|i| projects.get(i))
                {
                    self.location.push(&format!("/projects/{}", p.slug));
                }
            }
            "Gallery" => {
                for image in self.services.catalog.gallery().await? {
                    println!(
                        "- {} {}",
                        image.title.as_deref().unwrap_or("(untitled)"),
                        image.image_url
                    );
                }
            }
            "Contact" => self.contact_form().await?,
            "Admin" => self.location.push(ADMIN_PREFIX),
            _ => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    /// Public detail page for `/projects/<slug>`.
    async fn project_page(&self, slug: &str) -> Result<Flow, DomainError> {
        match self.services.catalog.project_by_slug(slug).await? {
            Some(p) => {
                println!("{}", p.title);
                if !p.description.is_empty() {
                    println!("{}", p.description);
                }
                if !p.tags.is_empty() {
                    println!("Tags: {}", p.tags.join(", "));
                }
                if let Some(url) = &p.repo_url {
                    println!("Repository: {}", url);
                }
                if let Some(url) = &p.demo_url {
                    println!("Demo: {}", url);
                }
                if let Some(url) = &p.cover_url {
                    println!("Cover: {}", url);
                }
            }
            None => println!("Project not found."),
        }
        self.location.push("/");
        Ok(Flow::Continue)
    }

    async fn contact_form(&self) -> Result<(), DomainError> {
        let owner = self.services.catalog.owner_contact().await?;
        if let Some(email) = &owner.email_contact {
            println!("Email: {}", email);
        }
        if let Some(number) = &owner.number_contact {
            println!("Phone: {}", number);
        }
        if let Some(github) = &owner.github_url {
            println!("GitHub: {}", github);
        }
        let message = ContactMessage {
            sender_name: ui(Text::new("Your name:").prompt())?,
            sender_email: ui(Text::new("Your email:").prompt())?,
            message: ui(Text::new("Message:").prompt())?,
        };
        match self.services.contact.submit(message).await {
            Ok(Notification::Failed) => {
                println!("Message sent. The owner could not be notified by email.")
            }
            Ok(_) => println!("Message sent."),
            Err(DomainError::Validation(reason)) => println!("Please check the form: {}", reason),
            Err(e) => return Err(e),
        }
        Ok(())
    }

    async fn login_page(&self) -> Result<Flow, DomainError> {
        println!("Admin login");
        let email = ui(Text::new("Email:").prompt())?;
        let password = ui(Password::new("Password:").without_confirmation().prompt())?;
        match self.services.login.sign_in(&email, &password).await {
            Ok(_) => Ok(Flow::Continue),
            Err(e) => {
                println!("{}", e);
                let next = ui(Select::new("Next", vec!["Try again", "Back to site", "Quit"])
                    .prompt())?;
                match next {
                    "Back to site" => {
                        self.location.push("/");
                        Ok(Flow::Continue)
                    }
                    "Quit" => Ok(Flow::Quit),
                    _ => Ok(Flow::Continue),
                }
            }
        }
    }

    /// Guarded admin area. Returns when the guard denies, the admin signs out or quits.
    async fn admin_area(&self) -> Result<Flow, DomainError> {
        let path = self.location.current_path();
        let mut guard = self.guard.mount(&path);
        if let Some(text) = guard.render().placeholder_text() {
            println!("{}", text);
        }
        if guard.settled().await != GuardDecision::Granted {
            return Ok(Flow::Continue);
        }
        info!(path = %path, "admin area opened");

        let mut search = SearchInput::mount(self.bus.clone(), self.address_bar());
        loop {
            if guard.decision() == GuardDecision::Pending {
                if let Some(text) = guard.render().placeholder_text() {
                    println!("{}", text);
                }
                guard.settled().await;
            }
            if guard.decision() != GuardDecision::Granted {
                println!("Session ended.");
                return Ok(Flow::Continue);
            }
            self.render_admin_route(&search).await?;

            let path = self.location.current_path();
            let choice = ui(Select::new("Admin", admin_menu(&path)).prompt())?;
            match choice {
                "Dashboard" => self.navigate(ADMIN_PREFIX, &search),
                "Projects" => self.navigate("/admin/projects", &search),
                "Gallery" => self.navigate("/admin/gallery", &search),
                "Profile" => self.navigate("/admin/profile", &search),
                "New project" => self.create_project().await?,
                "Edit project" => self.edit_project().await?,
                "Delete project" => self.delete_project().await?,
                "Add image" => self.add_image().await?,
                "Delete image" => self.delete_image().await?,
                "Edit profile" => self.edit_profile().await?,
                "Search" => {
                    let text = ui(Text::new("Search:")
                        .with_initial_value(search.value())
                        .with_help_message("empty to clear")
                        .prompt())?;
                    search.on_input(text.trim());
                }
                "Sign out" => {
                    self.services.login.sign_out().await?;
                    self.wait_denied(&mut guard).await;
                    return Ok(Flow::Continue);
                }
                _ => return Ok(Flow::Quit),
            }
        }
    }

    async fn wait_denied(&self, guard: &mut MountedGuard) {
        guard
            .wait_for(|s| s.decision == GuardDecision::Denied)
            .await;
    }

    fn navigate(&self, path: &str, search: &SearchInput) {
        self.location.push(&href_with_query(path, search.value()));
    }

    /// Render the current admin route with its own view, filtered by the search.
    async fn render_admin_route(&self, search: &SearchInput) -> Result<(), DomainError> {
        let path = self.location.current_path();
        if !search.value().is_empty() {
            println!("Search: \"{}\"", search.value());
        }
        match path.as_str() {
            "/admin/projects" => {
                let mut view = ProjectsView::mount(&self.bus, self.location.as_ref());
                view.set_items(self.services.projects.list_own().await?);
                let visible = view.visible();
                println!("Projects ({} of {})", visible.len(), view.items().len());
                for p in visible {
                    println!("- {}", project_line(p));
                }
            }
            "/admin/gallery" => {
                let mut view = GalleryView::mount(&self.bus, self.location.as_ref());
                view.set_items(self.services.gallery.list().await?);
                println!("Gallery ({} of {})", view.visible().len(), view.items().len());
                for image in view.visible() {
                    println!(
                        "- #{} {} {}",
                        image.id,
                        image.title.as_deref().unwrap_or("(untitled)"),
                        image.image_url
                    );
                }
            }
            "/admin/profile" => {
                let profile = self.services.profile.load().await?;
                println!(
                    "{} · {} · {}",
                    profile.display_name, profile.profession, profile.city_name
                );
                if !profile.bio.is_empty() {
                    println!("{}", profile.bio);
                }
            }
            _ => {
                let mut view = DashboardView::mount(&self.bus, self.location.as_ref());
                let projects = self.services.projects.list_own().await?;
                view.set_data(DashboardData::from_projects(&projects, Utc::now()));
                let counts = view.counts();
                println!(
                    "Projects: {} total, {} published, {} unpublished, {} this month",
                    counts.total,
                    counts.published,
                    counts.drafts,
                    view.data().monthly_projects.len()
                );
                println!("Top projects:");
                for p in view.top_projects() {
                    println!("  {}", project_line(p));
                }
                println!("Recent activity:");
                for a in view.recent_activity() {
                    println!("  {} {}: {} ({})", a.time, a.action, a.project, a.slug);
                }
            }
        }
        Ok(())
    }

    async fn create_project(&self) -> Result<(), DomainError> {
        let (draft, cover) = prompt_project(&ProjectDraft::default()).await?;
        let outcome = self.services.projects.create(draft, cover).await?;
        if outcome.cover_upload_failed {
            println!("Cover upload failed; project saved without it.");
        }
        println!("Project created.");
        Ok(())
    }

    async fn pick_project(&self) -> Result<Option<Project>, DomainError> {
        let projects = self.services.projects.list_own().await?;
        if projects.is_empty() {
            println!("No projects.");
            return Ok(None);
        }
        let labels: Vec<String> = projects.iter().map(project_line).collect();
        let picked = ui(Select::new("Project:", labels.clone()).prompt())?;
        Ok(labels
            .iter()
            .position(|l| *l == picked)
            .and_then(|i| projects.into_iter().nth(i)))
    }

    async fn edit_project(&self) -> Result<(), DomainError> {
        let Some(project) = self.pick_project().await? else {
            return Ok(());
        };
        let current = ProjectDraft {
            title: project.title.clone(),
            slug: project.slug.clone(),
            description: project.description.clone(),
            tags: project.tags.clone(),
            cover_url: project.cover_url.clone(),
            repo_url: project.repo_url.clone(),
            demo_url: project.demo_url.clone(),
            published: project.published,
        };
        let (draft, cover) = prompt_project(&current).await?;
        let outcome = self
            .services
            .projects
            .update(&project.id, draft, cover)
            .await?;
        if outcome.cover_upload_failed {
            println!("Cover upload failed; previous cover kept.");
        }
        println!("Project updated.");
        Ok(())
    }

    async fn delete_project(&self) -> Result<(), DomainError> {
        let Some(project) = self.pick_project().await? else {
            return Ok(());
        };
        if ui(Confirm::new(&format!("Delete \"{}\"?", project.title))
            .with_default(false)
            .prompt())?
        {
            self.services.projects.delete(&project.id).await?;
            println!("Project deleted.");
        }
        Ok(())
    }

    async fn add_image(&self) -> Result<(), DomainError> {
        let title = optional(ui(Text::new("Title:").prompt())?);
        let file = prompt_upload("Image file:").await?;
        let image_url = if file.is_none() {
            optional(ui(Text::new("Image URL:").prompt())?)
        } else {
            None
        };
        match self
            .services
            .gallery
            .add(NewImage {
                title,
                image_url,
                file,
            })
            .await
        {
            Ok(()) => println!("Image added."),
            Err(DomainError::Validation(reason)) => println!("{}", reason),
            Err(e) => return Err(e),
        }
        Ok(())
    }

    async fn delete_image(&self) -> Result<(), DomainError> {
        let images = self.services.gallery.list().await?;
        if images.is_empty() {
            println!("Gallery is empty.");
            return Ok(());
        }
        let labels: Vec<String> = images
            .iter()
            .map(|i| format!("#{} {}", i.id, i.title.as_deref().unwrap_or("(untitled)")))
            .collect();
        let picked = ui(Select::new("Image:", labels.clone()).prompt())?;
        if let Some(image) = labels
            .iter()
            .position(|l| *l == picked)
            .and_then(|i| images.get(i))
        {
            self.services.gallery.delete(image.id).await?;
            println!("Image deleted.");
        }
        Ok(())
    }

    async fn edit_profile(&self) -> Result<(), DomainError> {
        let current = self.services.profile.load().await?;
        let field = |label: &str, value: &str| -> Result<String, DomainError> {
            ui(Text::new(label).with_initial_value(value).prompt()).map(|s| s.trim().to_string())
        };
        let profile = Profile {
            display_name: field("Display name:", &current.display_name)?,
            bio: field("Bio:", &current.bio)?,
            avatar_url: current.avatar_url.clone(),
            city_name: field("City:", &current.city_name)?,
            city_image_url: current.city_image_url.clone(),
            profession: field("Profession:", &current.profession)?,
            email_contact: field("Contact email:", &current.email_contact)?,
            number_contact: field("Contact number:", &current.number_contact)?,
            github_url: field("GitHub URL:", &current.github_url)?,
        };
        let avatar = prompt_upload("Avatar file:").await?;
        let city_image = prompt_upload("City image file:").await?;
        self.services.profile.save(profile, avatar, city_image).await?;
        println!("Profile saved.");
        Ok(())
    }
}

/// Project form prefilled from `current`.
async fn prompt_project(
    current: &ProjectDraft,
) -> Result<(ProjectDraft, Option<UploadFile>), DomainError> {
    let title = ui(Text::new("Title:").with_initial_value(&current.title).prompt())?;
    let slug = ui(Text::new("Slug:")
        .with_initial_value(&current.slug)
        .with_help_message("empty to derive from the title")
        .prompt())?;
    let description = ui(Text::new("Description:")
        .with_initial_value(&current.description)
        .prompt())?;
    let tags = ui(Text::new("Tags:")
        .with_initial_value(&current.tags.join(", "))
        .with_help_message("comma separated")
        .prompt())?;
    let repo_url = ui(Text::new("Repository URL:")
        .with_initial_value(current.repo_url.as_deref().unwrap_or_default())
        .prompt())?;
    let demo_url = ui(Text::new("Demo URL:")
        .with_initial_value(current.demo_url.as_deref().unwrap_or_default())
        .prompt())?;
    let cover = prompt_upload("Cover image file:").await?;
    let cover_url = if cover.is_none() {
        optional(ui(Text::new("Cover URL:")
            .with_initial_value(current.cover_url.as_deref().unwrap_or_default())
            .prompt())?)
    } else {
        current.cover_url.clone()
    };
    let published = ui(Confirm::new("Published?")
        .with_default(current.published)
        .prompt())?;

    Ok((
        ProjectDraft {
            title,
            slug,
            description: description.trim().to_string(),
            tags: ProjectDraft::parse_tags(&tags),
            cover_url,
            repo_url: optional(repo_url),
            demo_url: optional(demo_url),
            published,
        },
        cover,
    ))
}

#[async_trait]
impl InputPort for TuiInputPort {
    async fn run(&self) -> Result<(), DomainError> {
        loop {
            let path = self.location.current_path();
            let flow = if path == self.guard.login_path() {
                self.login_page().await
            } else if path == ADMIN_PREFIX || path.starts_with("/admin/") {
                self.admin_area().await
            } else if let Some(slug) = project_slug(&path) {
                self.project_page(slug).await
            } else {
                self.public_page().await
            };
            match flow {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => return Ok(()),
                Err(DomainError::Ui(reason)) => {
                    info!(reason = %reason, "console closed");
                    return Ok(());
                }
                Err(e) => {
                    warn!(error = %e, path = %path, "action failed");
                    println!("Error: {}", e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_types_by_extension() {
        assert_eq!(content_type_for("me.JPG"), "image/jpeg");
        assert_eq!(content_type_for("a.webp"), "image/webp");
        assert_eq!(content_type_for("notes.txt"), "application/octet-stream");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
    }

    #[test]
    fn navigation_keeps_search_term() {
        assert_eq!(href_with_query("/admin/projects", ""), "/admin/projects");
        assert_eq!(
            href_with_query("/admin/gallery", "red fox"),
            "/admin/gallery?q=red%20fox"
        );
    }

    #[test]
    fn route_actions_lead_the_admin_menu() {
        assert_eq!(admin_menu("/admin")[0], "Dashboard");
        assert_eq!(admin_menu("/admin").len(), ADMIN_NAV.len());
        let projects = admin_menu("/admin/projects");
        assert_eq!(&projects[..3], ["New project", "Edit project", "Delete project"]);
        assert!(!admin_menu("/admin/gallery").contains(&"Edit project"));
        assert_eq!(admin_menu("/admin/profile")[0], "Edit profile");
        assert_eq!(admin_menu("/admin/gallery").last(), Some(&"Quit"));
    }

    #[test]
    fn project_detail_routes() {
        assert_eq!(project_slug("/projects/my-app"), Some("my-app"));
        assert_eq!(project_slug("/projects/"), None);
        assert_eq!(project_slug("/projects/a/b"), None);
        assert_eq!(project_slug("/gallery"), None);
    }

    #[tokio::test]
    async fn reading_a_missing_upload_is_a_validation_error() {
        assert!(matches!(
            read_upload("/definitely/not/here.png").await,
            Err(DomainError::Validation(_))
        ));
    }
}
