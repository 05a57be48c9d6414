use std::time::Duration as StdDuration;

use chrono::{Duration, TimeZone, Utc};
use tokio::time::Instant;
use uuid::Uuid;

use types::domain::{AuthUser, Profile, Role, Session, User};

pub fn user(role: Role, is_active: bool) -> User {
    let created = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    User {
        id: Uuid::from_u128(42),
        email: "amina@canstory.dz".to_string(),
        full_name: "Amina Benali".to_string(),
        role,
        wilaya: Some("Oran".to_string()),
        commune: Some("Bir El Djir".to_string()),
        language: "fr".to_string(),
        is_active,
        avatar_url: None,
        created_at: created,
        updated_at: created,
        last_login_at: None,
    }
}

pub fn profile(user_id: Uuid) -> Profile {
    let created = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    Profile {
        user_id,
        bio: Some("Two years in remission".to_string()),
        specialization: None,
        address: None,
        website: None,
        created_at: created,
        updated_at: created,
    }
}

pub fn session(user_id: Uuid) -> Session {
    Session {
        access_token: "access-1".to_string(),
        refresh_token: "refresh-1".to_string(),
        token_type: "bearer".to_string(),
        expires_at: Utc::now() + Duration::hours(1),
        user: AuthUser {
            id: user_id,
            email: Some("amina@canstory.dz".to_string()),
        },
    }
}

/// Paused-clock assertion with a little slack for timer rounding.
pub fn assert_elapsed(started: Instant, millis: u64) {
    let elapsed = started.elapsed();
    assert!(
        elapsed >= StdDuration::from_millis(millis)
            && elapsed < StdDuration::from_millis(millis + 10),
        "expected ~{}ms, waited {:?}",
        millis,
        elapsed
    );
}
