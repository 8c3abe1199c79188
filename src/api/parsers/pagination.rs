use crate::api::tokens::MetadataToken;

/// Check if a paginated response has pages after the current one
pub fn has_more_pages(metadata: &MetadataToken) -> bool {
    if metadata.items_per_page <= 0 {
        return false;
    }
    metadata.page * metadata.items_per_page < metadata.total
}
