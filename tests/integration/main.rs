mod reader_cache;
mod search_end_to_end;
