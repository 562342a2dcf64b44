//! # Search and filter predicates for list views
//!
//! Each list page (notes, blog, doctors, groups) narrows a cached collection
//! with a free-text search plus page-specific filters. All predicates here are
//! pure and synchronous:
//!
//! - search is a case-insensitive substring test over the entity's text fields,
//!   and an empty search matches everything;
//! - every active filter must hold (search AND tags AND ...);
//! - [`Filter::apply`] keeps the input order.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{BlogPost, Group, NoteView, TherapistProfile};

/// Case-insensitive substring test.
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn search_matches<'a, I>(needle: &str, fields: I) -> bool
where
    I: IntoIterator<Item = &'a str>,
{
    needle.is_empty() || fields.into_iter().any(|f| contains_ci(f, needle))
}

/// A predicate over one entity type.
pub trait Filter<T> {
    fn matches(&self, item: &T) -> bool;

    /// Items that satisfy the predicate, in input order.
    fn apply<'a>(&self, items: &'a [T]) -> Vec<&'a T> {
        items.iter().filter(|item| self.matches(item)).collect()
    }
}

/// Private notes page: search over title and decrypted content, plus a tag
/// selection that matches when the note carries any of the selected tags.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NoteFilter {
    pub search: String,
    pub tags: Vec<String>,
}

impl Filter<NoteView> for NoteFilter {
    fn matches(&self, note: &NoteView) -> bool {
        let matches_search = search_matches(&self.search, [note.title.as_str(), note.content.as_str()]);
        let matches_tags = self.tags.is_empty() || self.tags.iter().any(|t| note.tags.contains(t));
        matches_search && matches_tags
    }
}

/// Every distinct tag across `notes`, in first-seen order.
pub fn all_tags(notes: &[NoteView]) -> Vec<String> {
    let mut seen = HashSet::new();
    notes
        .iter()
        .flat_map(|n| n.tags.iter())
        .filter(|t| seen.insert(t.as_str()))
        .cloned()
        .collect()
}

/// Blog page: search over title and body, author name substring.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BlogFilter {
    pub search: String,
    pub author: String,
}

impl Filter<BlogPost> for BlogFilter {
    fn matches(&self, post: &BlogPost) -> bool {
        let matches_search = search_matches(&self.search, [post.title.as_str(), post.content.as_str()]);
        let author = self.author.trim();
        let matches_author = author.is_empty()
            || post
                .author_name()
                .map(|name| contains_ci(name, author))
                .unwrap_or(false);
        matches_search && matches_author
    }
}

/// Doctors page: search over name and specializations, exact specialization,
/// minimum average rating.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TherapistFilter {
    pub search: String,
    pub specialization: Option<String>,
    pub min_rating: f64,
}

impl Filter<TherapistProfile> for TherapistFilter {
    fn matches(&self, therapist: &TherapistProfile) -> bool {
        let fields = std::iter::once(therapist.full_name())
            .chain(therapist.specializations.iter().map(String::as_str));
        let matches_search = search_matches(&self.search, fields);
        let matches_specialization = match self.specialization.as_deref() {
            None | Some("") => true,
            Some(spec) => therapist.specializations.iter().any(|s| s == spec),
        };
        let matches_rating = therapist.average_rating >= self.min_rating;
        matches_search && matches_specialization && matches_rating
    }
}

/// Which groups to list relative to the viewer's memberships.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Membership {
    #[default]
    All,
    /// Groups the viewer belongs to.
    Mine,
    /// Groups the viewer can still join.
    Available,
}

/// Groups page: search over name, description and category, plus membership.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GroupFilter {
    pub search: String,
    pub membership: Membership,
    /// Ids of the groups the viewer has joined.
    pub joined: HashSet<Uuid>,
}

impl Filter<Group> for GroupFilter {
    fn matches(&self, group: &Group) -> bool {
        let matches_search = search_matches(
            &self.search,
            [
                group.name.as_str(),
                group.description.as_str(),
                group.category.as_str(),
            ],
        );
        let is_member = self.joined.contains(&group.id);
        let matches_membership = match self.membership {
            Membership::All => true,
            Membership::Mine => is_member,
            Membership::Available => !is_member,
        };
        matches_search && matches_membership
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PostStatus, ProfileRef};

    fn note(title: &str, content: &str, tags: &[&str]) -> NoteView {
        NoteView {
            id: Uuid::new_v4(),
            patient_id: Uuid::nil(),
            title: title.to_string(),
            content: content.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            created_at: None,
            updated_at: None,
            decrypt_failed: false,
        }
    }

    fn post(title: &str, content: &str, author: Option<&str>) -> BlogPost {
        BlogPost {
            id: Uuid::new_v4(),
            author_id: Uuid::new_v4(),
            title: title.to_string(),
            content: content.to_string(),
            status: PostStatus::Published,
            created_at: None,
            updated_at: None,
            author: author.map(|a| ProfileRef {
                full_name: a.to_string(),
            }),
        }
    }

    fn therapist(name: &str, specs: &[&str], rating: f64) -> TherapistProfile {
        TherapistProfile {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            specializations: specs.iter().map(|s| s.to_string()).collect(),
            license_number: None,
            years_experience: 5,
            bio: String::new(),
            hourly_rate: 150.0,
            location: None,
            avatar_url: None,
            availability_slots: vec![],
            average_rating: rating,
            total_reviews: 10,
            created_at: None,
            user_profile: Some(ProfileRef {
                full_name: name.to_string(),
            }),
        }
    }

    fn group(name: &str, description: &str, category: &str) -> Group {
        Group {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.to_string(),
            category: category.to_string(),
            is_private: false,
            creator_id: Uuid::new_v4(),
            created_at: None,
            creator: None,
        }
    }

    #[test]
    fn test_contains_ci() {
        assert!(contains_ci("Breathing Exercises", "breath"));
        assert!(contains_ci("ÉTÉ", "été"));
        assert!(!contains_ci("sleep", "wake"));
    }

    #[test]
    fn test_note_filter_search_and_tags() {
        let notes = vec![
            note("Monday", "Slept badly, anxious", &["sleep"]),
            note("Tuesday", "Good run", &["exercise"]),
            note("Wednesday", "anxious before meeting", &["work", "anxiety"]),
        ];

        let all = NoteFilter::default().apply(&notes);
        assert_eq!(all.len(), 3);

        let anxious = NoteFilter {
            search: "ANXIOUS".to_string(),
            tags: vec![],
        };
        let hits = anxious.apply(&notes);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "Monday");
        assert_eq!(hits[1].title, "Wednesday");

        let tagged = NoteFilter {
            search: "anxious".to_string(),
            tags: vec!["work".to_string(), "exercise".to_string()],
        };
        let hits = tagged.apply(&notes);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Wednesday");
    }

    #[test]
    fn test_search_term_is_not_trimmed() {
        let notes = vec![note("Monday", "Slept badly", &[])];
        let filter = |search: &str| NoteFilter {
            search: search.to_string(),
            tags: vec![],
        };
        assert_eq!(filter(" badly").apply(&notes).len(), 1);
        assert!(filter("badly ").apply(&notes).is_empty());
        assert!(filter("  ").apply(&notes).is_empty());
    }

    #[test]
    fn test_all_tags_first_seen_order() {
        let notes = vec![
            note("a", "", &["sleep", "work"]),
            note("b", "", &["work", "anxiety"]),
        ];
        assert_eq!(all_tags(&notes), vec!["sleep", "work", "anxiety"]);
    }

    #[test]
    fn test_blog_filter_is_conjunctive() {
        let posts = vec![
            post("Mindful mornings", "Start slow", Some("Dr. Sarah Johnson")),
            post("Mindful evenings", "Wind down", Some("Mike D.")),
            post("Mindful anywhere", "No author", None),
        ];
        let filter = BlogFilter {
            search: "mindful".to_string(),
            author: "sarah".to_string(),
        };
        let hits = filter.apply(&posts);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Mindful mornings");

        let search_only = BlogFilter {
            search: "wind".to_string(),
            author: String::new(),
        };
        assert_eq!(search_only.apply(&posts).len(), 1);
    }

    #[test]
    fn test_therapist_filter() {
        let list = vec![
            therapist("Dr. Sarah Johnson", &["Anxiety Disorders", "EMDR"], 4.8),
            therapist("Dr. Michael Chen", &["Depression"], 4.6),
            therapist("Dr. Emily Davis", &["Anxiety Disorders"], 4.9),
        ];

        let by_spec_text = TherapistFilter {
            search: "anxiety".to_string(),
            ..Default::default()
        };
        assert_eq!(by_spec_text.apply(&list).len(), 2);

        let strict = TherapistFilter {
            search: "dr.".to_string(),
            specialization: Some("Anxiety Disorders".to_string()),
            min_rating: 4.85,
        };
        let hits = strict.apply(&list);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].full_name(), "Dr. Emily Davis");

        let rating_edge = TherapistFilter {
            min_rating: 4.6,
            ..Default::default()
        };
        assert_eq!(rating_edge.apply(&list).len(), 3);
    }

    #[test]
    fn test_group_filter_membership() {
        let groups = vec![
            group("Anxiety Circle", "Weekly check-ins for anxious minds", "Anxiety"),
            group("Grief Support", "A space to share loss", "Grief & Loss"),
        ];
        let joined: HashSet<Uuid> = [groups[0].id].into_iter().collect();

        let mine = GroupFilter {
            membership: Membership::Mine,
            joined: joined.clone(),
            ..Default::default()
        };
        assert_eq!(mine.apply(&groups)[0].name, "Anxiety Circle");

        let available = GroupFilter {
            search: "loss".to_string(),
            membership: Membership::Available,
            joined: joined.clone(),
        };
        assert_eq!(available.apply(&groups).len(), 1);

        let mismatch = GroupFilter {
            search: "loss".to_string(),
            membership: Membership::Mine,
            joined,
        };
        assert!(mismatch.apply(&groups).is_empty());
    }
}
