//! Service configuration.

/// Configuration for the Gatehouse services.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Optional pepper prepended to passwords before Argon2id hashing and
    /// verification.
    pub pepper: Option<String>,
    /// Minimum password length for policy enforcement.
    pub min_password_length: usize,
    /// Accounts created by the default seed.
    pub seed: SeedConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            pepper: None,
            min_password_length: 6,
            seed: SeedConfig::default(),
        }
    }
}

/// Default seed settings.
#[derive(Debug, Clone)]
pub struct SeedConfig {
    pub admin_username: String,
    pub admin_email: String,
    pub admin_password: String,
    pub admin_group: String,
    pub admin_role: String,
    /// Modules created with all four actions.
    pub modules: Vec<(String, String)>,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            admin_username: "admin".into(),
            admin_email: "admin@example.com".into(),
            admin_password: "admin123".into(),
            admin_group: "Administrators".into(),
            admin_role: "Admin".into(),
            modules: [
                ("Users", "User management"),
                ("Groups", "Group management"),
                ("Roles", "Role management"),
                ("Modules", "Module management"),
                ("Permissions", "Permission management"),
            ]
            .into_iter()
            .map(|(name, description)| (name.to_owned(), description.to_owned()))
            .collect(),
        }
    }
}
