//! Plain-text subjects and bodies for every email category.

use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub body: String,
}

/// Renders emails with links into the frontend at `app_url`.
#[derive(Debug, Clone, Default)]
pub struct Templates {
    app_url: String,
}

impl Templates {
    pub fn new(app_url: impl Into<String>) -> Self {
        let app_url = app_url.into().trim_end_matches('/').to_string();
        Self { app_url }
    }

    pub fn app_url(&self) -> &str {
        &self.app_url
    }

    fn footer(&self) -> String {
        if self.app_url.is_empty() {
            "-- Mellon Harmony".to_string()
        } else {
            format!("-- Mellon Harmony\n{}", self.app_url)
        }
    }

    fn issue_url(&self, id: Uuid) -> String {
        format!("{}/issue/{}", self.app_url, id)
    }

    fn projects_url(&self) -> String {
        format!("{}/projects", self.app_url)
    }

    fn bullet_list(changes: &[String]) -> String {
        changes
            .iter()
            .map(|c| format!("  - {}", c))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn user_created(&self, name: &str, email: &str, password: &str) -> RenderedEmail {
        RenderedEmail {
            subject: "Welcome to Mellon Harmony".to_string(),
            body: format!(
                "Hi {name},\n\nAn account has been created for you.\n\n  Email: {email}\n  Password: {password}\n\nPlease change your password after your first login.\n\n{}",
                self.footer()
            ),
        }
    }

    pub fn user_updated(&self, name: &str, changes: &[String]) -> RenderedEmail {
        RenderedEmail {
            subject: "Your account has been updated".to_string(),
            body: format!(
                "Hi {name},\n\nThe following changes were made to your account:\n\n{}\n\n{}",
                Self::bullet_list(changes),
                self.footer()
            ),
        }
    }

    pub fn user_deleted(&self, name: &str) -> RenderedEmail {
        RenderedEmail {
            subject: "Your account has been deleted".to_string(),
            body: format!(
                "Hi {name},\n\nYour Mellon Harmony account has been deleted. Contact an administrator if this was a mistake.\n\n-- Mellon Harmony"
            ),
        }
    }

    pub fn issue_created(&self, title: &str, id: Uuid) -> RenderedEmail {
        RenderedEmail {
            subject: format!("New issue: {}", title),
            body: format!(
                "A new issue was created: \"{title}\"\n\nView it at {}\n\n{}",
                self.issue_url(id),
                self.footer()
            ),
        }
    }

    pub fn issue_updated(&self, title: &str, id: Uuid, changes: &[String]) -> RenderedEmail {
        RenderedEmail {
            subject: format!("Issue updated: {}", title),
            body: format!(
                "The issue \"{title}\" was updated:\n\n{}\n\nView it at {}\n\n{}",
                Self::bullet_list(changes),
                self.issue_url(id),
                self.footer()
            ),
        }
    }

    pub fn issue_assigned(&self, title: &str, id: Uuid, assigner: &str) -> RenderedEmail {
        RenderedEmail {
            subject: format!("You have been assigned an issue: {}", title),
            body: format!(
                "{assigner} assigned you the issue \"{title}\".\n\nView it at {}\n\n{}",
                self.issue_url(id),
                self.footer()
            ),
        }
    }

    pub fn project_created(&self, name: &str) -> RenderedEmail {
        RenderedEmail {
            subject: format!("New project: {}", name),
            body: format!(
                "A new project was created: \"{name}\"\n\nSee all projects at {}\n\n{}",
                self.projects_url(),
                self.footer()
            ),
        }
    }

    pub fn project_updated(&self, name: &str, changes: &[String]) -> RenderedEmail {
        RenderedEmail {
            subject: format!("Project updated: {}", name),
            body: format!(
                "The project \"{name}\" was updated:\n\n{}\n\nSee all projects at {}\n\n{}",
                Self::bullet_list(changes),
                self.projects_url(),
                self.footer()
            ),
        }
    }

    pub fn notification(&self, title: &str, message: &str) -> RenderedEmail {
        RenderedEmail {
            subject: title.to_string(),
            body: format!(
                "{message}\n\nAll your notifications: {}/notifications\n\n{}",
                self.app_url,
                self.footer()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_links_use_app_url() {
        let templates = Templates::new("https://harmony.example.com/");
        let id = Uuid::new_v4();
        let email = templates.issue_assigned("Fix login", id, "Ada");
        assert_eq!(email.subject, "You have been assigned an issue: Fix login");
        assert!(email
            .body
            .contains(&format!("https://harmony.example.com/issue/{}", id)));
        assert!(email.body.starts_with("Ada assigned you"));
    }

    #[test]
    fn test_changes_are_listed() {
        let templates = Templates::new("");
        let email = templates.project_updated(
            "Apollo",
            &["name updated".to_string(), "deadline updated".to_string()],
        );
        assert_eq!(email.subject, "Project updated: Apollo");
        assert!(email.body.contains("  - name updated\n  - deadline updated"));
    }

    #[test]
    fn test_notification_subject_is_title() {
        let email = Templates::default().notification("New client created: Acme", "Ada created a new client");
        assert_eq!(email.subject, "New client created: Acme");
        assert!(email.body.starts_with("Ada created a new client"));
    }
}
