use mongodb::{Database, IndexModel, options::IndexOptions};
use tracing::info;

use crate::{Entity, models::*};

pub async fn ensure_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    // Check-ins
    create_indexes(
        db,
        Checkin::COLLECTION,
        vec![
            index(bson::doc! { "user_id": 1 }),
            index(bson::doc! { "hub_id": 1, "expires_at": 1 }),
        ],
    )
    .await?;

    // Match actions
    create_indexes(
        db,
        MatchAction::COLLECTION,
        vec![
            index_unique(bson::doc! { "user_id": 1, "target_id": 1 }),
            index(bson::doc! { "target_id": 1, "action": 1 }),
        ],
    )
    .await?;

    // Chats
    create_indexes(
        db,
        Chat::COLLECTION,
        vec![
            index_unique_sparse(bson::doc! { "direct_key": 1 }),
            index(bson::doc! { "member_ids": 1 }),
        ],
    )
    .await?;

    // Messages
    create_indexes(
        db,
        ChatMessage::COLLECTION,
        vec![index(bson::doc! { "chat_id": 1, "created_at": 1 })],
    )
    .await?;

    // Notifications
    create_indexes(
        db,
        NotificationEntry::COLLECTION,
        vec![
            index_unique(bson::doc! { "user_id": 1, "dedupe_key": 1 }),
            index(bson::doc! { "user_id": 1, "created_at": -1 }),
        ],
    )
    .await?;

    info!("All indexes ensured");
    Ok(())
}

fn index(keys: bson::Document) -> IndexModel {
    IndexModel::builder().keys(keys).build()
}

fn index_unique(keys: bson::Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

fn index_unique_sparse(keys: bson::Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).sparse(true).build())
        .build()
}

async fn create_indexes(
    db: &Database,
    collection: &str,
    indexes: Vec<IndexModel>,
) -> Result<(), mongodb::error::Error> {
    db.collection::<bson::Document>(collection)
        .create_indexes(indexes)
        .await?;
    info!(collection, "Indexes created");
    Ok(())
}
