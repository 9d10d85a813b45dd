// Student-only content assembly: the topic -> material -> attachment tree
// behind the class-material section.

use std::collections::HashMap;

use futures::future;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::AppResult;
use crate::models::material::{Material, MaterialPdf, MaterialPresentation, MaterialVideo, Topic};

#[derive(Debug, Clone, Serialize)]
pub struct MaterialView {
    #[serde(flatten)]
    pub material: Material,
    pub pdfs: Vec<MaterialPdf>,
    pub videos: Vec<MaterialVideo>,
    pub presentations: Vec<MaterialPresentation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopicView {
    #[serde(flatten)]
    pub topic: Topic,
    pub materials: Vec<MaterialView>,
}

/// Active topics with their active materials and attachments, everything in
/// its configured order. The three attachment kinds are independent queries
/// and run concurrently.
pub async fn assemble_topics(pool: &SqlitePool) -> AppResult<Vec<TopicView>> {
    let topics = Topic::list_active(pool).await?;
    let topic_ids: Vec<i64> = topics.iter().map(|t| t.id).collect();
    let materials = Material::active_for_topics(pool, &topic_ids).await?;
    let material_ids: Vec<i64> = materials.iter().map(|m| m.id).collect();

    let (pdfs, videos, presentations) = future::try_join3(
        MaterialPdf::active_for_materials(pool, &material_ids),
        MaterialVideo::active_for_materials(pool, &material_ids),
        MaterialPresentation::active_for_materials(pool, &material_ids),
    )
    .await?;

    let mut pdfs_by_material: HashMap<i64, Vec<MaterialPdf>> = HashMap::new();
    for pdf in pdfs {
        pdfs_by_material.entry(pdf.material_id).or_default().push(pdf);
    }
    let mut videos_by_material: HashMap<i64, Vec<MaterialVideo>> = HashMap::new();
    for video in videos {
        videos_by_material
            .entry(video.material_id)
            .or_default()
            .push(video);
    }
    let mut presentations_by_material: HashMap<i64, Vec<MaterialPresentation>> = HashMap::new();
    for presentation in presentations {
        presentations_by_material
            .entry(presentation.material_id)
            .or_default()
            .push(presentation);
    }

    let mut materials_by_topic: HashMap<i64, Vec<MaterialView>> = HashMap::new();
    for material in materials {
        let view = MaterialView {
            pdfs: pdfs_by_material.remove(&material.id).unwrap_or_default(),
            videos: videos_by_material.remove(&material.id).unwrap_or_default(),
            presentations: presentations_by_material
                .remove(&material.id)
                .unwrap_or_default(),
            material,
        };
        materials_by_topic
            .entry(view.material.topic_id)
            .or_default()
            .push(view);
    }

    Ok(topics
        .into_iter()
        .map(|topic| {
            let materials = materials_by_topic.remove(&topic.id).unwrap_or_default();
            TopicView { topic, materials }
        })
        .collect())
}
