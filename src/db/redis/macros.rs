/// Read-through caching for metadata lookups.
///
/// Checks the cache for `$key`; on a miss, evaluates `$block`, stores the
/// result with `$ttl` seconds to live, and returns it. A failed cache read
/// is treated as a miss so a dead Redis degrades lookups to upstream calls
/// instead of failing the request.
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        match $cache.get_from_cache(&$key).await {
            Ok(Some(cached)) => Ok(cached),
            Ok(None) => {
                let value = $block.await?;
                $cache.set_in_background(&$key, &value, $ttl);
                Ok(value)
            }
            Err(e) => {
                tracing::warn!(error = %e, key = %$key, "Cache read failed, bypassing");
                $block.await
            }
        }
    }};
}
