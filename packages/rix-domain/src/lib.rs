pub mod event;
pub mod normalize;
pub mod room;
pub mod search;

pub use event::{ChangeEvent, DecodeError, EventKind};
pub use room::{IndexedRoom, RoomStatus, RoomType};
pub use search::{
	FacetCounts, PriceRange, QueryPage, RoomQuery, RoomSearchRequest, SearchResponse, SortOrder,
	SuggestionResponse,
};
