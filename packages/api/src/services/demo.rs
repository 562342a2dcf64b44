//! Sample accounts and content for demo mode, so a fresh in-memory server has
//! therapists to browse and book.

use chrono::NaiveDate;
use tracing::info;

use store::models::{
    AvailabilitySlot, BlogDraft, PostStatus, Registration, TherapistProfileInput, UserRole,
};

use super::Platform;
use crate::backend::{eq, Table};
use crate::error::ApiError;

/// Password of every seeded account.
pub const DEMO_PASSWORD: &str = "MindCare123";

struct DemoTherapist {
    email: &'static str,
    name: &'static str,
    specializations: &'static [&'static str],
    bio: &'static str,
    years: u32,
    rate: f64,
    rating: f64,
    reviews: u32,
    location: &'static str,
    slots: &'static [(&'static str, &'static str, &'static str)],
}

const THERAPISTS: [DemoTherapist; 2] = [
    DemoTherapist {
        email: "sarah@mindcare.com",
        name: "Dr. Sarah Johnson",
        specializations: &["Anxiety Disorders", "Depression", "Cognitive Behavioral Therapy"],
        bio: "Dr. Johnson has over 10 years of experience helping patients overcome anxiety \
              and depression. She specializes in Cognitive Behavioral Therapy and has helped \
              hundreds of patients develop effective coping strategies.",
        years: 10,
        rate: 150.0,
        rating: 4.8,
        reviews: 127,
        location: "New York, NY",
        slots: &[
            ("Monday", "09:00", "17:00"),
            ("Wednesday", "09:00", "17:00"),
            ("Friday", "09:00", "17:00"),
        ],
    },
    DemoTherapist {
        email: "michael@mindcare.com",
        name: "Dr. Michael Chen",
        specializations: &["PTSD/Trauma", "EMDR"],
        bio: "Dr. Chen specializes in trauma-informed care and PTSD treatment. He uses \
              evidence-based approaches including EMDR and has extensive experience working \
              with veterans and first responders.",
        years: 15,
        rate: 180.0,
        rating: 4.9,
        reviews: 203,
        location: "Los Angeles, CA",
        slots: &[
            ("Tuesday", "10:00", "18:00"),
            ("Thursday", "10:00", "18:00"),
            ("Saturday", "09:00", "15:00"),
        ],
    },
];

const WELCOME_POST: &str = "Starting therapy can feel like a big step. This space is for \
sharing what has helped you, asking questions, and reading how others manage hard days. \
Be kind, keep details you are not comfortable sharing in your private notes, and reach out \
to a therapist whenever you need to talk.";

/// Register the demo therapists with complete directory entries and publish a
/// welcome post.
pub async fn seed_demo(platform: &Platform, today: NaiveDate) -> Result<(), ApiError> {
    let mut first = None;
    for demo in &THERAPISTS {
        let form = Registration {
            email: demo.email.to_string(),
            password: DEMO_PASSWORD.to_string(),
            confirm_password: DEMO_PASSWORD.to_string(),
            full_name: demo.name.to_string(),
            phone: "+1 (555) 010-0000".to_string(),
            user_type: UserRole::Therapist,
            date_of_birth: None,
            primary_concern: None,
            specialization: demo.specializations.first().map(|s| s.to_string()),
            license_number: Some(format!("DEMO-{}", demo.years)),
            years_experience: Some(demo.years as i64),
            bio: Some(demo.bio.to_string()),
        };
        let user = platform.register(form, today).await?;

        let profile = TherapistProfileInput {
            specializations: demo.specializations.iter().map(|s| s.to_string()).collect(),
            years_experience: demo.years,
            bio: demo.bio.to_string(),
            hourly_rate: demo.rate,
            location: Some(demo.location.to_string()),
            availability_slots: demo
                .slots
                .iter()
                .map(|(day, start, end)| AvailabilitySlot {
                    day: day.to_string(),
                    start_time: start.to_string(),
                    end_time: end.to_string(),
                })
                .collect(),
            license_number: Some(format!("DEMO-{}", demo.years)),
            ..TherapistProfileInput::blank(user.id)
        };
        platform.save_therapist_profile(&user, profile).await?;

        // Ratings come from reviews, which only the backend writes.
        platform
            .backend()
            .update(
                Table::TherapistProfiles,
                &[eq("user_id", user.id)],
                serde_json::json!({
                    "average_rating": demo.rating,
                    "total_reviews": demo.reviews,
                }),
                user.token(),
            )
            .await?;
        first.get_or_insert(user);
    }

    if let Some(author) = first {
        platform
            .create_post(
                &author,
                BlogDraft {
                    title: "Welcome to the MindCare community".to_string(),
                    content: WELCOME_POST.to_string(),
                    status: PostStatus::Published,
                },
            )
            .await?;
    }
    info!("Seeded {} demo therapists", THERAPISTS.len());
    Ok(())
}
