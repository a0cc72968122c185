//! Repository for videos and their derived artifacts.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Sqlite};
use std::collections::HashMap;
use tracing::debug;

use vedit_models::{
    NewOverlay, NewTrimmedVideo, NewVideo, NewVideoQuality, Overlay, QualityPreset, TrimmedVideo,
    Video, VideoDetail, VideoId, VideoQuality,
};

use crate::error::{DbError, DbResult};
use crate::DbPool;

const VIDEO_COLUMNS: &str = "SELECT id, filename, duration, size, upload_time FROM videos";
const TRIMMED_COLUMNS: &str =
    "SELECT id, original_video_id, filename, duration, size, upload_time FROM trimmed_videos";
const OVERLAY_COLUMNS: &str =
    "SELECT id, video_id, overlay_type, content, x, y, start_time, end_time, filename FROM overlays";
const QUALITY_COLUMNS: &str =
    "SELECT id, original_video_id, quality, filename, size FROM video_qualities";

/// CRUD access to the `videos` table and its child tables.
#[derive(Clone)]
pub struct VideoRepository {
    pool: DbPool,
}

impl VideoRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Cheap round trip used by readiness checks.
    pub async fn ping(&self) -> DbResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn get_video(&self, id: VideoId) -> DbResult<Option<Video>> {
        let row = sqlx::query_as::<_, VideoRow>(&format!("{VIDEO_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    /// Videos ordered by id, paginated.
    pub async fn list_videos(&self, skip: i64, limit: i64) -> DbResult<Vec<Video>> {
        let rows = sqlx::query_as::<_, VideoRow>(&format!(
            "{VIDEO_COLUMNS} ORDER BY id ASC LIMIT ? OFFSET ?"
        ))
        .bind(limit.max(0))
        .bind(skip.max(0))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn get_video_detail(&self, id: VideoId) -> DbResult<Option<VideoDetail>> {
        let Some(video) = self.get_video(id).await? else {
            return Ok(None);
        };
        Ok(self.attach_children(vec![video]).await?.pop())
    }

    /// Paginated videos with trims, overlays and qualities attached.
    pub async fn list_video_details(&self, skip: i64, limit: i64) -> DbResult<Vec<VideoDetail>> {
        let videos = self.list_videos(skip, limit).await?;
        self.attach_children(videos).await
    }

    pub async fn create_video(&self, new: &NewVideo) -> DbResult<Video> {
        let row = sqlx::query_as::<_, VideoRow>(
            r#"
            INSERT INTO videos (filename, duration, size, upload_time)
            VALUES (?, ?, ?, ?)
            RETURNING id, filename, duration, size, upload_time
            "#,
        )
        .bind(&new.filename)
        .bind(new.duration)
        .bind(new.size)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        debug!(video_id = row.id, filename = %row.filename, "Inserted video");
        Ok(row.into())
    }

    pub async fn create_trimmed_video(&self, new: &NewTrimmedVideo) -> DbResult<TrimmedVideo> {
        let row = sqlx::query_as::<_, TrimmedVideoRow>(
            r#"
            INSERT INTO trimmed_videos (original_video_id, filename, duration, size, upload_time)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id, original_video_id, filename, duration, size, upload_time
            "#,
        )
        .bind(new.original_video_id)
        .bind(&new.filename)
        .bind(new.duration)
        .bind(new.size)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DbError::from_insert(e, || format!("video {}", new.original_video_id)))?;

        debug!(trim_id = row.id, video_id = row.original_video_id, "Inserted trimmed video");
        Ok(row.into())
    }

    pub async fn create_overlay(&self, new: &NewOverlay) -> DbResult<Overlay> {
        let row = sqlx::query_as::<_, OverlayRow>(
            r#"
            INSERT INTO overlays (video_id, overlay_type, content, x, y, start_time, end_time, filename)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id, video_id, overlay_type, content, x, y, start_time, end_time, filename
            "#,
        )
        .bind(new.video_id)
        .bind(new.overlay_type.as_str())
        .bind(&new.content)
        .bind(new.x)
        .bind(new.y)
        .bind(new.start_time)
        .bind(new.end_time)
        .bind(&new.filename)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DbError::from_insert(e, || format!("video {}", new.video_id)))?;

        debug!(overlay_id = row.id, video_id = row.video_id, kind = %row.overlay_type, "Inserted overlay");
        row.try_into()
    }

    pub async fn create_video_quality(&self, new: &NewVideoQuality) -> DbResult<VideoQuality> {
        let row = sqlx::query_as::<_, VideoQualityRow>(
            r#"
            INSERT INTO video_qualities (original_video_id, quality, filename, size)
            VALUES (?, ?, ?, ?)
            RETURNING id, original_video_id, quality, filename, size
            "#,
        )
        .bind(new.original_video_id)
        .bind(new.quality.as_str())
        .bind(&new.filename)
        .bind(new.size)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DbError::from_insert(e, || format!("video {}", new.original_video_id)))?;

        debug!(quality_id = row.id, video_id = row.original_video_id, quality = %row.quality, "Inserted quality");
        Ok(row.into())
    }

    /// Most recent rendition of a video at the given quality.
    pub async fn find_quality(
        &self,
        video_id: VideoId,
        quality: QualityPreset,
    ) -> DbResult<Option<VideoQuality>> {
        let row = sqlx::query_as::<_, VideoQualityRow>(&format!(
            "{QUALITY_COLUMNS} WHERE original_video_id = ? AND quality = ? ORDER BY id DESC LIMIT 1"
        ))
        .bind(video_id)
        .bind(quality.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn attach_children(&self, videos: Vec<Video>) -> DbResult<Vec<VideoDetail>> {
        let ids: Vec<VideoId> = videos.iter().map(|v| v.id).collect();

        let mut trims = group_by(
            self.fetch_for_videos::<TrimmedVideoRow>(TRIMMED_COLUMNS, "original_video_id", &ids)
                .await?
                .into_iter()
                .map(TrimmedVideo::from),
            |t| t.original_video_id,
        );
        let mut overlays = group_by(
            self.fetch_for_videos::<OverlayRow>(OVERLAY_COLUMNS, "video_id", &ids)
                .await?
                .into_iter()
                .map(Overlay::try_from)
                .collect::<DbResult<Vec<_>>>()?,
            |o| o.video_id,
        );
        let mut qualities = group_by(
            self.fetch_for_videos::<VideoQualityRow>(QUALITY_COLUMNS, "original_video_id", &ids)
                .await?
                .into_iter()
                .map(VideoQuality::from),
            |q| q.original_video_id,
        );

        Ok(videos
            .into_iter()
            .map(|video| {
                let id = video.id;
                VideoDetail {
                    video,
                    trimmed_videos: trims.remove(&id).unwrap_or_default(),
                    overlays: overlays.remove(&id).unwrap_or_default(),
                    qualities: qualities.remove(&id).unwrap_or_default(),
                }
            })
            .collect())
    }

    /// Child rows whose `key_column` is one of `ids`, ordered by id.
    async fn fetch_for_videos<R>(&self, select: &str, key_column: &str, ids: &[VideoId]) -> DbResult<Vec<R>>
    where
        R: for<'r> sqlx::FromRow<'r, SqliteRow> + Send + Unpin,
    {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<Sqlite>::new(select);
        builder.push(" WHERE ").push(key_column).push(" IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY id ASC");

        Ok(builder.build_query_as::<R>().fetch_all(&self.pool).await?)
    }
}

fn group_by<T>(items: impl IntoIterator<Item = T>, key: impl Fn(&T) -> VideoId) -> HashMap<VideoId, Vec<T>> {
    let mut map: HashMap<VideoId, Vec<T>> = HashMap::new();
    for item in items {
        map.entry(key(&item)).or_default().push(item);
    }
    map
}

#[derive(sqlx::FromRow)]
struct VideoRow {
    id: i64,
    filename: String,
    duration: f64,
    size: f64,
    upload_time: DateTime<Utc>,
}

impl From<VideoRow> for Video {
    fn from(row: VideoRow) -> Self {
        Video {
            id: row.id,
            filename: row.filename,
            duration: row.duration,
            size: row.size,
            upload_time: row.upload_time,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TrimmedVideoRow {
    id: i64,
    original_video_id: i64,
    filename: String,
    duration: f64,
    size: f64,
    upload_time: DateTime<Utc>,
}

impl From<TrimmedVideoRow> for TrimmedVideo {
    fn from(row: TrimmedVideoRow) -> Self {
        TrimmedVideo {
            id: row.id,
            original_video_id: row.original_video_id,
            filename: row.filename,
            duration: row.duration,
            size: row.size,
            upload_time: row.upload_time,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OverlayRow {
    id: i64,
    video_id: i64,
    overlay_type: String,
    content: String,
    x: i64,
    y: i64,
    start_time: f64,
    end_time: f64,
    filename: Option<String>,
}

impl TryFrom<OverlayRow> for Overlay {
    type Error = DbError;

    fn try_from(row: OverlayRow) -> Result<Self, Self::Error> {
        Ok(Overlay {
            id: row.id,
            video_id: row.video_id,
            overlay_type: row.overlay_type.parse().map_err(DbError::InvalidRow)?,
            content: row.content,
            x: row.x,
            y: row.y,
            start_time: row.start_time,
            end_time: row.end_time,
            filename: row.filename,
        })
    }
}

#[derive(sqlx::FromRow)]
struct VideoQualityRow {
    id: i64,
    original_video_id: i64,
    quality: String,
    filename: String,
    size: f64,
}

impl From<VideoQualityRow> for VideoQuality {
    fn from(row: VideoQualityRow) -> Self {
        VideoQuality {
            id: row.id,
            original_video_id: row.original_video_id,
            quality: row.quality,
            filename: row.filename,
            size: row.size,
        }
    }
}
