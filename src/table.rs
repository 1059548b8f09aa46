use polars::prelude::DataFrame;

/// In-memory batch passed between the stages of one run.
#[derive(Debug, Clone, Default)]
pub struct Table {
    frame: DataFrame,
}

impl Table {
    pub fn new(frame: DataFrame) -> Self {
        Self { frame }
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn width(&self) -> usize {
        self.frame.width()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect()
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn frame_mut(&mut self) -> &mut DataFrame {
        &mut self.frame
    }

    pub fn into_frame(self) -> DataFrame {
        self.frame
    }
}

impl From<DataFrame> for Table {
    fn from(frame: DataFrame) -> Self {
        Table::new(frame)
    }
}
