//! Pure rendering of Swarm records into Block Kit trees.
//!
//! Nothing here performs I/O: the same record always renders to the same blocks, which is
//! what lets a review be shown both as a list row and as a detail modal and tested without a
//! backend.

use std::collections::HashSet;

use chrono::DateTime;
use swarmbot_core::{Review, ReviewType, ReviewsData, User};

use crate::action_id::{ActionId, CHANGE_REVIEW_TYPE};
use crate::blocks::{
    Block, BlockElement, BlocksBuilder, ButtonElement, ButtonStyle, ImageElement, OptionObject,
    StaticSelectElement, View,
};

pub const SWARM_BEE_IMAGE_URL: &str =
    "https://swarm.workshop.perforce.com/view/guest/perforce_software/slack/main/images/60x60-Helix-Bee.png";
pub const CHANGELIST_ICON_URL: &str =
    "https://api.slack.com/img/blocks/bkb_template_images/task-icon.png";
pub const REVIEW_DETAILS_CALLBACK_ID: &str = "review-details";

const UNKNOWN: &str = "unknown";

/// One labelled line of the detail dump. `None` means the field is absent and is skipped.
struct DetailField {
    label: &'static str,
    value: fn(&Review) -> Option<String>,
}

/// Detail layout, in display order.
const REVIEW_DETAIL_FIELDS: &[DetailField] = &[
    DetailField { label: "ID", value: detail_id },
    DetailField { label: "Author", value: detail_author },
    DetailField { label: "Description", value: detail_description },
    DetailField { label: "Status", value: detail_status },
    DetailField { label: "Deploy status", value: detail_deploy_status },
    DetailField { label: "Test status", value: detail_test_status },
    DetailField { label: "Commit status", value: detail_commit_status },
    DetailField { label: "Commits", value: detail_commits },
    DetailField { label: "Changes", value: detail_changes },
    DetailField { label: "Comments", value: detail_comments },
    DetailField { label: "Participants", value: detail_participants },
    DetailField { label: "Created", value: detail_created },
    DetailField { label: "Last updated", value: detail_updated },
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewComposer {
    review_url_base: String,
}

impl ViewComposer {
    /// `review_url_base` is prefixed to a review id to link it, e.g.
    /// `https://swarm.example.com/reviews/`.
    pub fn new(review_url_base: impl Into<String>) -> Self {
        Self { review_url_base: review_url_base.into() }
    }

    pub fn review_url(&self, review: &Review) -> String {
        format!("{}{}", self.review_url_base, review.id)
    }

    /// List-row form: divider, summary, submitter context and the action row.
    pub fn compact_review(&self, review: &Review) -> Vec<Block> {
        let id = review.id;
        let summary = format!(
            "*Change List:* <{}| :link: {id}>\n*Description:* {}\n*Status:* {}",
            self.review_url(review),
            review.description.as_deref().unwrap_or(UNKNOWN),
            review.state_label.as_deref().unwrap_or(UNKNOWN),
        );
        let submitted = format!(
            "Submitted by: *{}* on {}",
            review.author.as_deref().unwrap_or(UNKNOWN),
            review.created.and_then(format_date).unwrap_or_else(|| UNKNOWN.to_owned()),
        );

        BlocksBuilder::new()
            .divider(format!("review.{id}.divider"))
            .section(format!("review.{id}.summary"), |section| {
                section
                    .mrkdwn(summary)
                    .accessory(BlockElement::Image(ImageElement::new(SWARM_BEE_IMAGE_URL, "Helix Swarm Bee")));
            })
            .context(format!("review.{id}.context"), |context| {
                context.image(CHANGELIST_ICON_URL, "Changelist").mrkdwn(submitted);
            })
            .actions(format!("review.{id}.actions"), |actions| {
                let details = ActionId::details(id).encode();
                actions.button(ButtonElement::new(details.clone(), "View Details").value(details));

                if review.awaits_decision() {
                    let approve = ActionId::approve(id).encode();
                    let decline = ActionId::decline(id).encode();
                    actions
                        .button(
                            ButtonElement::new(approve.clone(), "Approve")
                                .style(ButtonStyle::Primary)
                                .value(approve),
                        )
                        .button(
                            ButtonElement::new(decline.clone(), "Decline")
                                .style(ButtonStyle::Danger)
                                .value(decline),
                        );
                }
            })
            .build()
    }

    /// Full field dump in a single section. Absent fields are left out.
    pub fn review_detail(&self, review: &Review) -> Vec<Block> {
        let text = REVIEW_DETAIL_FIELDS
            .iter()
            .filter_map(|field| {
                (field.value)(review).map(|value| format!("*{}:* {value}", field.label))
            })
            .collect::<Vec<_>>()
            .join("\n");

        BlocksBuilder::new()
            .section(format!("review.{}.detail", review.id), |section| {
                section.mrkdwn(text);
            })
            .build()
    }

    /// Every field is shown, empty when the backend left it out.
    pub fn user_summary(&self, user: &User) -> Vec<Block> {
        let text = format!(
            "*Username:* {}\n*Email:* {}\n*Full Name:* {}\n*Reviews:* {}",
            user.username.as_deref().unwrap_or_default(),
            user.email.as_deref().unwrap_or_default(),
            user.full_name.as_deref().unwrap_or_default(),
            user.reviews.join(", "),
        );

        BlocksBuilder::new()
            .section("user.summary", |section| {
                section.mrkdwn(text);
            })
            .build()
    }

    /// Home tab body. Without reviews only the selector and the trailing divider remain.
    pub fn home_surface(&self, review_type: ReviewType, data: Option<&ReviewsData>) -> Vec<Block> {
        let mut builder = BlocksBuilder::new().section("home.review_type", |section| {
            section
                .mrkdwn("*Review request type:*")
                .accessory(BlockElement::StaticSelect(review_type_selector(review_type)));
        });

        if let Some(data) = data.filter(|data| !data.is_empty()) {
            builder = builder.section("home.reviews.header", |section| {
                section.mrkdwn("*Review requests*");
            });
            // Block ids are keyed by review id and must be unique within a view.
            let mut listed = HashSet::new();
            for review in data.reviews.iter().filter(|review| listed.insert(review.id)) {
                builder = builder.extend(self.compact_review(review));
            }
            builder = builder.divider("home.footer.divider").section("home.footer", |section| {
                section.mrkdwn(footer_text(data));
            });
        }

        builder.divider("home.trailing_divider").build()
    }

    pub fn home_view(&self, review_type: ReviewType, data: Option<&ReviewsData>) -> View {
        View::home(self.home_surface(review_type, data))
    }

    pub fn review_detail_modal(&self, review: &Review) -> View {
        View::modal(REVIEW_DETAILS_CALLBACK_ID, "Review Details", self.review_detail(review))
    }
}

pub fn footer_text(data: &ReviewsData) -> String {
    format!("Last seen: {}\tTotal reviews: {}", data.last_seen_label(), data.total_count_or_zero())
}

fn review_type_selector(active: ReviewType) -> StaticSelectElement {
    let options = ReviewType::SELECTABLE
        .into_iter()
        .map(|review_type| (review_type, OptionObject::new(review_type.description(), review_type.value())));

    let mut select = StaticSelectElement::new(CHANGE_REVIEW_TYPE);
    let mut initial = None;
    for (review_type, option) in options {
        if review_type == active {
            initial = Some(option.clone());
        }
        select = select.option(option);
    }
    select.initial_option(initial)
}

/// ISO date (UTC) of an epoch-millisecond timestamp.
pub fn format_date(epoch_millis: i64) -> Option<String> {
    DateTime::from_timestamp_millis(epoch_millis).map(|moment| moment.format("%Y-%m-%d").to_string())
}

fn join_numbers(values: &[i64]) -> Option<String> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().map(i64::to_string).collect::<Vec<_>>().join(", "))
}

fn detail_id(review: &Review) -> Option<String> {
    Some(review.id.to_string())
}

fn detail_author(review: &Review) -> Option<String> {
    review.author.clone()
}

fn detail_description(review: &Review) -> Option<String> {
    review.description.clone()
}

fn detail_status(review: &Review) -> Option<String> {
    Some(match &review.state_label {
        Some(label) => format!("{label} (`{}`)", review.state),
        None => format!("`{}`", review.state),
    })
}

fn detail_deploy_status(review: &Review) -> Option<String> {
    review.deploy_status.clone()
}

fn detail_test_status(review: &Review) -> Option<String> {
    review.test_status.clone()
}

fn detail_commit_status(review: &Review) -> Option<String> {
    review.commit_status.clone()
}

fn detail_commits(review: &Review) -> Option<String> {
    join_numbers(&review.commits)
}

fn detail_changes(review: &Review) -> Option<String> {
    join_numbers(&review.changes)
}

fn detail_comments(review: &Review) -> Option<String> {
    join_numbers(&review.comments)
}

fn detail_participants(review: &Review) -> Option<String> {
    let names = review.participant_names();
    (!names.is_empty()).then(|| names.join(", "))
}

fn detail_created(review: &Review) -> Option<String> {
    review.created.and_then(format_date)
}

fn detail_updated(review: &Review) -> Option<String> {
    review.updated.and_then(format_date)
}
