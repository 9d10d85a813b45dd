// Public content assembly: the facet -> milestone -> image tree the index
// page renders, shaped by the caller's preferences when they have any.

use std::collections::HashMap;

use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::AppResult;
use crate::models::facet::Facet;
use crate::models::milestone::{Milestone, MilestoneImage};
use crate::models::video::{parse_video_url, VideoEmbed};

#[derive(Debug, Clone, Serialize)]
pub struct MilestoneView {
    #[serde(flatten)]
    pub milestone: Milestone,
    pub images: Vec<MilestoneImage>,
    /// Derived from the external video URL when one is set.
    pub video_embed: Option<VideoEmbed>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FacetView {
    #[serde(flatten)]
    pub facet: Facet,
    pub milestones: Vec<MilestoneView>,
    /// Slides the facet occupies on the public site: one title slide plus one
    /// per active milestone. Presentation-only, never persisted.
    pub total_slides: usize,
}

/// Build the public tree. Anonymous callers see every active facet in its
/// configured order; an authenticated caller sees exactly the facets they
/// hold a preference for, in preference-priority order — a user with no
/// preferences sees an empty list, deliberately.
pub async fn assemble_facets(
    pool: &SqlitePool,
    user_id: Option<i64>,
) -> AppResult<Vec<FacetView>> {
    let facets = match user_id {
        Some(uid) => Facet::list_preferred(pool, uid).await?,
        None => Facet::list_active(pool).await?,
    };

    let facet_ids: Vec<i64> = facets.iter().map(|f| f.id).collect();
    let milestones = Milestone::active_for_facets(pool, &facet_ids).await?;
    let milestone_ids: Vec<i64> = milestones.iter().map(|m| m.id).collect();
    let images = MilestoneImage::active_for_milestones(pool, &milestone_ids).await?;

    let mut images_by_milestone: HashMap<i64, Vec<MilestoneImage>> = HashMap::new();
    for image in images {
        images_by_milestone
            .entry(image.milestone_id)
            .or_default()
            .push(image);
    }

    let mut milestones_by_facet: HashMap<i64, Vec<MilestoneView>> = HashMap::new();
    for milestone in milestones {
        let images = images_by_milestone
            .remove(&milestone.id)
            .unwrap_or_default();
        let video_embed = milestone
            .video_url
            .as_deref()
            .map(parse_video_url);
        milestones_by_facet
            .entry(milestone.facet_id)
            .or_default()
            .push(MilestoneView {
                milestone,
                images,
                video_embed,
            });
    }

    Ok(facets
        .into_iter()
        .map(|facet| {
            let milestones = milestones_by_facet.remove(&facet.id).unwrap_or_default();
            let total_slides = 1 + milestones.len();
            FacetView {
                facet,
                milestones,
                total_slides,
            }
        })
        .collect())
}
