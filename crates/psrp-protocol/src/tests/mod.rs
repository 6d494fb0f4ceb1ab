mod creation_xml;
mod parse_real_pipeline_output;
