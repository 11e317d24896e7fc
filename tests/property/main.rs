mod matcher_properties;
mod search_properties;
