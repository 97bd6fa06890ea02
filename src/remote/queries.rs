//! GraphQL documents sent to the platform API. The item query exists in two
//! variants because deployments disagree on whether item ids are `[ID!]` or
//! `[Int!]`; see `fetch_item_smart`.

pub const ITEM_QUERY_ID: &str = "\
query ($itemIds: [ID!]) {
  items(ids: $itemIds) {
    id
    name
    board { id name }
    column_values { id text column { title type } value }
    assets { id name url_thumbnail url public_url }
  }
}";

pub const ITEM_QUERY_INT: &str = "\
query ($itemIds: [Int!]) {
  items(ids: $itemIds) {
    id
    name
    board { id name }
    column_values { id text column { title type } value }
    assets { id name url_thumbnail url public_url }
  }
}";

pub const BOARD_ITEMS_QUERY: &str = "\
query ($boardId: [ID!], $limit: Int!) {
  boards(ids: $boardId) {
    items_page(limit: $limit) {
      items { id name }
    }
  }
}";

pub const ASSETS_QUERY: &str = "\
query ($ids: [ID!]) {
  assets(ids: $ids) { id name public_url url url_thumbnail }
}";

pub const CHANGE_COLUMN_VALUE_MUTATION: &str = "\
mutation ($itemId: ID!, $boardId: ID!, $columnId: String!, $value: JSON!) {
  change_column_value(item_id: $itemId, board_id: $boardId, column_id: $columnId, value: $value) {
    id
  }
}";

pub const ADD_FILE_TO_COLUMN_MUTATION: &str = "\
mutation ($file: File!, $itemId: ID!, $columnId: String!) {
  add_file_to_column(file: $file, item_id: $itemId, column_id: $columnId) {
    id
  }
}";
