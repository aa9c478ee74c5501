use model::WithId;
use utility::id::HasId;

pub mod position;

pub trait DatabaseRow {
    type Model: HasId<IdType = i64>;

    fn to_model(self) -> WithId<Self::Model>;
}

pub fn with_ids<R: DatabaseRow>(rows: Vec<R>) -> Vec<WithId<R::Model>> {
    rows.into_iter().map(DatabaseRow::to_model).collect()
}
