//! Deterministic sample users for the demo and the tests.

use super::{Role, User};
use chrono::{DateTime, Duration, SecondsFormat, Utc};

const NAMES: [&str; 15] = [
    "Ada", "Grace", "Alan", "Edsger", "Barbara", "Donald", "Frances", "Ken", "Margaret", "Niklaus",
    "Radia", "Dennis", "Sophie", "John", "Leslie",
];

const ROLES: [Role; 4] = [Role::Subscriber, Role::Author, Role::Subscriber, Role::Admin];

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_709_283_600, 0).unwrap_or_default()
}

/// Fifteen users, one hour apart, in creation order.
pub fn users() -> Vec<User> {
    NAMES
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let created = epoch() + Duration::hours(i as i64);
            User::new(*name, format!("{}@example.com", name.to_lowercase()))
                .with_password(format!("{}-secret", name.to_lowercase()))
                .with_role(ROLES[i % ROLES.len()])
                .created_at(created.to_rfc3339_opts(SecondsFormat::Millis, true))
        })
        .collect()
}

/// How many fixture users hold `role`.
pub fn count_role(users: &[User], role: Role) -> usize {
    users.iter().filter(|u| u.role == Some(role)).count()
}
