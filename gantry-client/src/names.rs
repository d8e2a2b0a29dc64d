//! Random resource names

use uuid::Uuid;

/// Lowercase alphanumeric suffix of up to 32 characters
pub fn random_suffix(len: usize) -> String {
    Uuid::new_v4().simple().to_string().chars().take(len).collect()
}

/// `<prefix>-<6 random characters>`, valid as a Kubernetes name and a branch
pub fn generate_name(prefix: &str) -> String {
    format!("{}-{}", prefix, random_suffix(6))
}
